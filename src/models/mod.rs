//! # Data Models
//!
//! This module contains the SeaORM entities backing the leaderboard and the
//! activity tables, plus shared response models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod activity;
pub mod top_repository;

pub use activity::Entity as Activity;
pub use top_repository::Entity as TopRepository;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "ghstats".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

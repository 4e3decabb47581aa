//! Leaderboard entity model
//!
//! This module contains the SeaORM entity model for the `top100` table,
//! one row per repository currently on the leaderboard with a rank history
//! of depth one.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// Leaderboard row keyed by repository full name
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "top100")]
pub struct Model {
    /// Repository full name in `owner/name` form (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub repo: String,

    /// Login of the repository owner
    pub owner: String,

    /// Rank assigned by the most recent ingestion pass (1-based)
    pub position_cur: i32,

    /// Rank held before the most recent pass; `None` for newcomers
    pub position_prev: Option<i32>,

    pub stars: i32,
    pub watchers: i32,
    pub forks: i32,
    pub open_issues: i32,

    /// Primary language reported by GitHub
    pub language: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! # API Handlers
//!
//! HTTP endpoint handlers for the read API.

pub mod activity;
pub mod repos;

use crate::models::ServiceInfo;
use axum::response::Json;

pub use activity::repo_activity;
pub use repos::top100;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

//! # Leaderboard Handlers
//!
//! `GET /api/repos/top100`

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{self, ApiError};
use crate::models::top_repository;
use crate::repositories::{LeaderboardRepository, SortColumn, SortOrder};
use crate::server::AppState;

const TOP100_PARAMS: [&str; 2] = ["sort_by", "order"];

/// One leaderboard entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepoResponse {
    /// Repository full name (`owner/name`)
    pub repo: String,
    pub owner: String,
    /// Current rank (1-based)
    pub position_cur: i32,
    /// Rank before the latest ingestion pass
    pub position_prev: Option<i32>,
    pub stars: i32,
    pub watchers: i32,
    pub forks: i32,
    pub open_issues: i32,
    pub language: Option<String>,
}

impl From<top_repository::Model> for RepoResponse {
    fn from(model: top_repository::Model) -> Self {
        Self {
            repo: model.repo,
            owner: model.owner,
            position_cur: model.position_cur,
            position_prev: model.position_prev,
            stars: model.stars,
            watchers: model.watchers,
            forks: model.forks,
            open_issues: model.open_issues,
            language: model.language,
        }
    }
}

/// Validate raw query parameters against the allow-lists.
///
/// Unknown parameter names are a 400; a known parameter with a value outside
/// its allow-list is a 422.
pub fn parse_top100_params(
    params: &BTreeMap<String, String>,
) -> Result<(SortColumn, SortOrder), ApiError> {
    let unknown: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|key| !TOP100_PARAMS.contains(key))
        .collect();
    if !unknown.is_empty() {
        return Err(error::validation_error(
            &format!("Unknown query parameters: {}", unknown.join(", ")),
            json!({ "unknown_parameters": unknown, "allowed": TOP100_PARAMS }),
        ));
    }

    let sort_by = match params.get("sort_by") {
        None => SortColumn::default(),
        Some(value) => value.parse::<SortColumn>().map_err(|_| {
            error::unprocessable(
                &format!(
                    "Invalid sort_by value '{}'. Allowed values: {}",
                    value,
                    SortColumn::ALLOWED.join(", ")
                ),
                json!({ "parameter": "sort_by", "value": value, "allowed": SortColumn::ALLOWED }),
            )
        })?,
    };

    let order = match params.get("order") {
        None => SortOrder::default(),
        Some(value) => value.parse::<SortOrder>().map_err(|_| {
            error::unprocessable(
                &format!(
                    "Invalid order value '{}'. Allowed values: {}",
                    value,
                    SortOrder::ALLOWED.join(", ")
                ),
                json!({ "parameter": "order", "value": value, "allowed": SortOrder::ALLOWED }),
            )
        })?,
    };

    Ok((sort_by, order))
}

/// Current leaderboard, sorted by an allow-listed column
#[utoipa::path(
    get,
    path = "/api/repos/top100",
    params(
        ("sort_by" = Option<String>, Query, description = "Sort column: stars, watchers, forks, open_issues, language (default stars)"),
        ("order" = Option<String>, Query, description = "Sort direction: asc or desc (default desc)")
    ),
    responses(
        (status = 200, description = "Leaderboard rows", body = Vec<RepoResponse>),
        (status = 400, description = "Unknown query parameter", body = ApiError),
        (status = 404, description = "Leaderboard is empty", body = ApiError),
        (status = 422, description = "Invalid parameter value", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "repositories"
)]
pub async fn top100(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<RepoResponse>>, ApiError> {
    let (sort_by, order) = parse_top100_params(&params)?;
    info!(sort_by = %sort_by, order = order.as_str(), "Leaderboard requested");

    let repository = LeaderboardRepository::new(Arc::clone(&state.db));
    let rows = repository.list_sorted(sort_by, order).await?;

    if rows.is_empty() {
        warn!("Leaderboard is empty");
        return Err(error::not_found("No repositories found"));
    }

    Ok(Json(rows.into_iter().map(RepoResponse::from).collect()))
}

//! # Activity Handlers
//!
//! `GET /api/repos/{owner}/{repo}/activity`

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::error::{self, ApiError};
use crate::models::activity;
use crate::repositories::ActivityRepository;
use crate::server::AppState;

/// Query parameters for the activity endpoint
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// First day of the range, inclusive (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Last day of the range, inclusive (YYYY-MM-DD)
    pub end_date: Option<String>,
}

/// Commit activity for one day
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityEntry {
    pub date: NaiveDate,
    pub commits: i32,
    /// Distinct commit authors, sorted
    pub authors: Vec<String>,
}

impl From<activity::Model> for ActivityEntry {
    fn from(model: activity::Model) -> Self {
        Self {
            date: model.date,
            commits: model.commits,
            authors: model.authors.0,
        }
    }
}

/// Activity rows plus an optional notice about data availability
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub activity: Vec<ActivityEntry>,
}

fn parse_date_param(name: &str, value: Option<&str>) -> Result<NaiveDate, ApiError> {
    let Some(raw) = value else {
        return Err(error::unprocessable(
            &format!("{} is required", name),
            json!({ "parameter": name, "format": "YYYY-MM-DD" }),
        ));
    };

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        error::validation_error(
            &format!("{} must be a date in YYYY-MM-DD format", name),
            json!({ "parameter": name, "value": raw }),
        )
    })
}

/// Validate and parse the date range.
pub fn parse_date_range(query: &ActivityQuery) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let start = parse_date_param("start_date", query.start_date.as_deref())?;
    let end = parse_date_param("end_date", query.end_date.as_deref())?;

    if start > end {
        return Err(error::validation_error(
            "start_date must not be after end_date",
            json!({ "start_date": start.to_string(), "end_date": end.to_string() }),
        ));
    }

    Ok((start, end))
}

/// Build the response body, flagging ranges that start before the stored data.
pub fn build_activity_response(
    repo: &str,
    start: NaiveDate,
    rows: Vec<activity::Model>,
) -> ActivityResponse {
    let Some(earliest) = rows.first().map(|row| row.date) else {
        return ActivityResponse {
            message: Some(format!(
                "No activity stored for {} in the requested range",
                repo
            )),
            activity: Vec::new(),
        };
    };

    let message = (earliest > start).then(|| {
        format!(
            "Requested range exceeds stored data; activity is only available from {}",
            earliest
        )
    });

    ActivityResponse {
        message,
        activity: rows.into_iter().map(ActivityEntry::from).collect(),
    }
}

/// Daily commit activity of one repository over an inclusive date range
#[utoipa::path(
    get,
    path = "/api/repos/{owner}/{repo}/activity",
    params(
        ("owner" = String, Path, description = "Repository owner"),
        ("repo" = String, Path, description = "Repository name"),
        ActivityQuery
    ),
    responses(
        (status = 200, description = "Activity rows, possibly empty, with an optional notice", body = ActivityResponse),
        (status = 400, description = "Invalid date or range", body = ApiError),
        (status = 422, description = "Missing date parameter", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "activity"
)]
pub async fn repo_activity(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let (start, end) = parse_date_range(&query)?;
    let full_name = format!("{}/{}", owner, repo);

    let repository = ActivityRepository::new(Arc::clone(&state.db));
    let rows = repository
        .list_for_repo_between(&full_name, start, end)
        .await?;

    let response = build_activity_response(&full_name, start, rows);
    if response.activity.is_empty() {
        info!(repo = %full_name, %start, %end, "No activity in range");
    } else if response.message.is_some() {
        warn!(repo = %full_name, %start, "Requested range starts before stored activity");
    }

    Ok(Json(response))
}

//! # Server Configuration
//!
//! Router assembly and the HTTP entry point for the read API.

use std::sync::Arc;

use anyhow::Context;
use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/repos/top100", get(handlers::top100))
        .route(
            "/api/repos/{owner}/{repo}/activity",
            get(handlers::repo_activity),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serve the read API until `shutdown` fires.
pub async fn run_server(
    config: &AppConfig,
    db: Arc<DatabaseConnection>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = create_app(AppState { db });

    let addr = config.bind_addr().context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::repos::top100,
        crate::handlers::activity::repo_activity,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::repos::RepoResponse,
            crate::handlers::activity::ActivityEntry,
            crate::handlers::activity::ActivityResponse,
            crate::error::ApiError,
        )
    ),
    info(
        title = "ghstats API",
        description = "Leaderboard and commit activity of the most-starred GitHub repositories",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

//! Database pool setup and startup checks.
//!
//! One SeaORM pool is shared by the read API and the ingestion pipeline.
//! `serve`, `ingest` and `schedule` call [`ensure_schema`] after connecting so
//! a database that was never migrated fails at startup instead of on the
//! first request or at the end of a pass.

use std::time::Duration;

use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{AppConfig, redact_url_password};

const CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_CONNECT_BACKOFF: Duration = Duration::from_millis(100);

/// Tables the read API and the reconciliation store depend on.
pub const REQUIRED_TABLES: [&str; 2] = ["top100", "activity"];

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
    #[error("Failed to connect to {target} after {attempts} attempts: {source}")]
    ConnectionFailed {
        target: String,
        attempts: u32,
        #[source]
        source: DbErr,
    },
    #[error("Database health check failed: {0}")]
    Unhealthy(#[source] DbErr),
    #[error("Table `{table}` is missing or unreadable; run `ghstats migrate` first: {source}")]
    SchemaMissing {
        table: &'static str,
        #[source]
        source: DbErr,
    },
}

fn is_in_memory_sqlite(url: &str) -> bool {
    url.starts_with("sqlite::memory:") || url.contains("mode=memory")
}

/// Connection options for `cfg`.
///
/// Every connection to an in-memory SQLite database gets its own empty
/// database, so those URLs are pinned to one connection that never expires.
pub fn connect_options(cfg: &AppConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    if is_in_memory_sqlite(&cfg.database_url) {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(cfg.db_max_connections)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800));
    }
    opt
}

/// Opens the pool, retrying with exponential backoff while the database
/// comes up.
///
/// ```no_run
/// use ghstats::{config::AppConfig, db::{ensure_schema, init_pool}};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::default();
///     let db = init_pool(&config).await?;
///     ensure_schema(&db).await?;
///     db.close().await?;
///     Ok(())
/// }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection, DatabaseError> {
    if cfg.database_url.trim().is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "GHSTATS_DATABASE_URL cannot be empty".to_string(),
        });
    }

    let target = redact_url_password(&cfg.database_url);
    let opt = connect_options(cfg);
    let mut delay = INITIAL_CONNECT_BACKOFF;
    let mut attempt = 1;

    loop {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                info!(
                    database = %target,
                    backend = ?conn.get_database_backend(),
                    attempt,
                    "Connected to database"
                );
                return Ok(conn);
            }
            Err(source) if attempt >= CONNECT_ATTEMPTS => {
                return Err(DatabaseError::ConnectionFailed {
                    target,
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                warn!(
                    database = %target,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "Database connection attempt failed"
                );
                sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}

/// Runs `SELECT 1` through the pool.
pub async fn health_check(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1");
    db.query_one(stmt).await.map_err(DatabaseError::Unhealthy)?;
    Ok(())
}

/// Checks that every table in [`REQUIRED_TABLES`] can be read.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    let backend = db.get_database_backend();
    for table in REQUIRED_TABLES {
        let select = Query::select()
            .expr(Expr::val(1))
            .from(Alias::new(table))
            .limit(1)
            .to_owned();
        db.query_one(backend.build(&select))
            .await
            .map_err(|source| DatabaseError::SchemaMissing { table, source })?;
    }
    Ok(())
}

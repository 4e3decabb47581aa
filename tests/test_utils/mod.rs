//! Test utilities for database and HTTP testing.
//!
//! In-memory SQLite databases with migrations applied, a Postgres container
//! for the array-typed schema, row seeding helpers and a helper that serves
//! the router on an ephemeral port.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use ghstats::models::activity::{self, Authors};
use ghstats::models::top_repository;
use ghstats::server::{AppState, create_app};
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryOrder, Set,
};
use std::sync::Arc;
use testcontainers_modules::{
    postgres::Postgres,
    testcontainers::{ContainerAsync, runners::AsyncRunner},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool is pinned to one connection so every query sees the same
/// in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Starts a Postgres container and applies all migrations.
///
/// The container stops when the returned handle is dropped, so keep it alive
/// for the duration of the test.
#[allow(dead_code)]
pub async fn setup_postgres_db() -> Result<(DatabaseConnection, ContainerAsync<Postgres>)> {
    let container = Postgres::default()
        .start()
        .await
        .context("failed to start postgres container")?;
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;

    let mut opt = ConnectOptions::new(format!(
        "postgres://postgres:postgres@{}:{}/postgres",
        host, port
    ));
    opt.max_connections(5).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;

    Ok((db, container))
}

#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// Inserts a leaderboard row directly.
#[allow(dead_code)]
pub async fn insert_leaderboard_row(
    db: &DatabaseConnection,
    repo: &str,
    position_cur: i32,
    stars: i32,
    language: Option<&str>,
) -> Result<()> {
    let owner = repo.split('/').next().unwrap_or(repo).to_string();
    let row = top_repository::ActiveModel {
        repo: Set(repo.to_string()),
        owner: Set(owner),
        position_cur: Set(position_cur),
        position_prev: Set(None),
        stars: Set(stars),
        watchers: Set(stars),
        forks: Set(stars / 10),
        open_issues: Set(position_cur),
        language: Set(language.map(str::to_string)),
    };
    top_repository::Entity::insert(row)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Inserts an activity row directly.
#[allow(dead_code)]
pub async fn insert_activity_row(
    db: &DatabaseConnection,
    repo: &str,
    date: NaiveDate,
    authors: &[&str],
) -> Result<()> {
    let row = activity::Model {
        repo: repo.to_string(),
        date,
        commits: authors.len() as i32,
        authors: Authors(authors.iter().map(|a| a.to_string()).collect()),
    };
    let backend = db.get_database_backend();
    let insert = activity::insert_statement(backend, &[row])?;
    db.execute(backend.build(&insert)).await?;
    Ok(())
}

/// All leaderboard rows ordered by current rank.
#[allow(dead_code)]
pub async fn leaderboard_rows(db: &DatabaseConnection) -> Result<Vec<top_repository::Model>> {
    Ok(top_repository::Entity::find()
        .order_by_asc(top_repository::Column::PositionCur)
        .all(db)
        .await?)
}

/// All activity rows ordered by repository then date.
#[allow(dead_code)]
pub async fn activity_rows(db: &DatabaseConnection) -> Result<Vec<activity::Model>> {
    Ok(activity::Entity::find()
        .order_by_asc(activity::Column::Repo)
        .order_by_asc(activity::Column::Date)
        .all(db)
        .await?)
}

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Handle that stops a spawned test server when dropped.
#[allow(dead_code)]
pub struct TestServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

#[allow(dead_code)]
impl TestServerHandle {
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.join_handle.take() {
            handle.await.context("server task join failed")??;
        }

        Ok(())
    }
}

impl Drop for TestServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Serve the router for `db` on an ephemeral port and return its base URL.
#[allow(dead_code)]
pub async fn spawn_test_app(db: Arc<DatabaseConnection>) -> (String, TestServerHandle) {
    let app = create_app(AppState { db });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_url = format!("http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .context("axum server error")
    });

    (
        server_url,
        TestServerHandle {
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(server_task),
        },
    )
}

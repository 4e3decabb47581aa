//! Reconciliation of a pass's results into `top100` and `activity`.
//!
//! Both operations run on whatever connection they are handed; the
//! orchestrator passes its transaction so a pass commits or rolls back as one.

use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, Set};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ingestion::{ActivityRecord, Repository};
use crate::models::activity::{self, Authors};
use crate::models::top_repository;

/// Rows per bulk insert; keeps each statement well under bind-parameter limits.
const ACTIVITY_INSERT_CHUNK: usize = 500;

/// A failed database statement, tagged with what the store was doing.
#[derive(Debug, Error)]
#[error("storage operation '{operation}' failed: {source}")]
pub struct StorageError {
    pub operation: &'static str,
    #[source]
    pub source: DbErr,
}

fn map_db_err(operation: &'static str) -> impl FnOnce(DbErr) -> StorageError {
    move |source| StorageError { operation, source }
}

/// Row-count summary of a leaderboard reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaderboardDiff {
    pub inserted: usize,
    pub updated: usize,
    pub removed: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationStore;

impl ReconciliationStore {
    pub fn new() -> Self {
        Self
    }

    /// Make `top100` mirror `repositories`, keeping one level of rank history.
    ///
    /// Rank is index + 1. `position_prev` takes the row's previous
    /// `position_cur`, or `NULL` for newcomers. Rows absent from the input are
    /// deleted, so an empty input empties the table.
    pub async fn upsert_leaderboard<C>(
        &self,
        conn: &C,
        repositories: &[Repository],
    ) -> Result<LeaderboardDiff, StorageError>
    where
        C: ConnectionTrait,
    {
        let existing: HashMap<String, i32> = top_repository::Entity::find()
            .select_only()
            .column(top_repository::Column::Repo)
            .column(top_repository::Column::PositionCur)
            .into_tuple::<(String, i32)>()
            .all(conn)
            .await
            .map_err(map_db_err("read leaderboard positions"))?
            .into_iter()
            .collect();

        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(repositories.len());
        let mut diff = LeaderboardDiff::default();

        for (index, repo) in repositories.iter().enumerate() {
            if !seen.insert(repo.full_name.as_str()) {
                warn!(repo = %repo.full_name, rank = index + 1, "Duplicate repository in listing, keeping first rank");
                continue;
            }

            let position_prev = existing.get(&repo.full_name).copied();
            if position_prev.is_some() {
                diff.updated += 1;
            } else {
                diff.inserted += 1;
            }

            rows.push(top_repository::ActiveModel {
                repo: Set(repo.full_name.clone()),
                owner: Set(repo.owner.clone()),
                position_cur: Set(to_db_int(index + 1)),
                position_prev: Set(position_prev),
                stars: Set(to_db_int(repo.stars as usize)),
                watchers: Set(to_db_int(repo.watchers as usize)),
                forks: Set(to_db_int(repo.forks as usize)),
                open_issues: Set(to_db_int(repo.open_issues as usize)),
                language: Set(repo.language.clone()),
            });
        }

        let mut delete = top_repository::Entity::delete_many();
        if !seen.is_empty() {
            let keep: Vec<String> = seen.iter().map(|s| s.to_string()).collect();
            delete = delete.filter(top_repository::Column::Repo.is_not_in(keep));
        }
        diff.removed = delete
            .exec(conn)
            .await
            .map_err(map_db_err("delete stale leaderboard rows"))?
            .rows_affected;

        if !rows.is_empty() {
            top_repository::Entity::insert_many(rows)
                .on_conflict(
                    OnConflict::column(top_repository::Column::Repo)
                        .update_columns([
                            top_repository::Column::Owner,
                            top_repository::Column::PositionCur,
                            top_repository::Column::PositionPrev,
                            top_repository::Column::Stars,
                            top_repository::Column::Watchers,
                            top_repository::Column::Forks,
                            top_repository::Column::OpenIssues,
                            top_repository::Column::Language,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(conn)
                .await
                .map_err(map_db_err("upsert leaderboard rows"))?;
        }

        debug!(
            inserted = diff.inserted,
            updated = diff.updated,
            removed = diff.removed,
            "Leaderboard reconciled"
        );
        Ok(diff)
    }

    /// Replace the whole `activity` table with `records`.
    ///
    /// An empty input leaves the table untouched and returns 0.
    pub async fn replace_activity<C>(
        &self,
        conn: &C,
        records: &[ActivityRecord],
    ) -> Result<u64, StorageError>
    where
        C: ConnectionTrait,
    {
        if records.is_empty() {
            debug!("No activity records; keeping existing activity rows");
            return Ok(0);
        }

        let deleted = activity::Entity::delete_many()
            .exec(conn)
            .await
            .map_err(map_db_err("clear activity"))?
            .rows_affected;

        let backend = conn.get_database_backend();
        let mut saved = 0;
        for chunk in records.chunks(ACTIVITY_INSERT_CHUNK) {
            let rows: Vec<activity::Model> = chunk
                .iter()
                .map(|record| activity::Model {
                    repo: record.repo.clone(),
                    date: record.date,
                    commits: to_db_int(record.commits as usize),
                    authors: Authors(record.authors.iter().cloned().collect()),
                })
                .collect();

            let insert = activity::insert_statement(backend, &rows)
                .map_err(map_db_err("insert activity rows"))?;
            saved += conn
                .execute(backend.build(&insert))
                .await
                .map_err(map_db_err("insert activity rows"))?
                .rows_affected();
        }

        debug!(deleted, saved, "Activity replaced");
        Ok(saved)
    }
}

fn to_db_int(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

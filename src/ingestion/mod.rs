//! # Ingestion
//!
//! One ingestion pass lists the current top repositories, fetches their
//! recent commit activity concurrently and reconciles both into the store
//! inside a single transaction.

pub mod activity;
pub mod lister;
pub mod orchestrator;
pub mod store;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Days, NaiveDate, Utc};
use thiserror::Error;

use crate::github::{GitHubError, SearchRepository};

pub use activity::{ActivityFetch, ActivityFetcher, GitHubActivityFetcher};
pub use lister::{GitHubRepositoryLister, RepositoryLister};
pub use orchestrator::IngestionOrchestrator;
pub use store::{LeaderboardDiff, ReconciliationStore, StorageError};

/// A repository as listed by the leaderboard query. Rank is its index + 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub full_name: String,
    pub owner: String,
    pub stars: u32,
    pub watchers: u32,
    pub forks: u32,
    pub open_issues: u32,
    pub language: Option<String>,
}

impl From<SearchRepository> for Repository {
    fn from(item: SearchRepository) -> Self {
        Self {
            full_name: item.full_name,
            owner: item.owner.login,
            stars: item.stargazers_count,
            watchers: item.watchers_count,
            forks: item.forks_count,
            open_issues: item.open_issues_count,
            language: item.language,
        }
    }
}

/// Commit activity for one calendar day of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub commits: u32,
    pub authors: BTreeSet<String>,
}

/// A [`DailyActivity`] tagged with the repository it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub repo: String,
    pub date: NaiveDate,
    pub commits: u32,
    pub authors: BTreeSet<String>,
}

impl ActivityRecord {
    pub fn from_daily(repo: &str, daily: DailyActivity) -> Self {
        Self {
            repo: repo.to_string(),
            date: daily.date,
            commits: daily.commits,
            authors: daily.authors,
        }
    }
}

/// Inclusive calendar-date window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ActivityWindow {
    /// Window of `days` days ending on `end`. The start saturates at the
    /// earliest representable date.
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    /// Window of `days` days ending today (UTC).
    pub fn ending_today(days: u32) -> Self {
        Self::ending_on(Utc::now().date_naive(), days)
    }

    /// Lower bound sent upstream: start of the first day.
    pub fn since(&self) -> String {
        format!("{}T00:00:00Z", self.start.format("%Y-%m-%d"))
    }

    /// Upper bound sent upstream: last second of the final day.
    pub fn until(&self) -> String {
        format!("{}T23:59:59Z", self.end.format("%Y-%m-%d"))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Lifecycle of one ingestion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStage {
    Idle,
    Listing,
    Fetching,
    Reconciling,
    Committed,
    Aborted,
}

impl PassStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStage::Idle => "idle",
            PassStage::Listing => "listing",
            PassStage::Fetching => "fetching",
            PassStage::Reconciling => "reconciling",
            PassStage::Committed => "committed",
            PassStage::Aborted => "aborted",
        }
    }
}

impl fmt::Display for PassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a committed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassResult {
    pub repositories_processed: usize,
    pub activity_records_saved: u64,
    pub degraded_repositories: usize,
}

/// Failures that abort a pass before anything is committed.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("failed to list top repositories: {0}")]
    Upstream(#[from] GitHubError),

    #[error("repository listing returned no entries")]
    EmptyListing,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestionError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestionError::Upstream(_) => "upstream",
            IngestionError::EmptyListing => "empty_listing",
            IngestionError::Storage(_) => "storage",
        }
    }
}

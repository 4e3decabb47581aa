//! Per-repository commit activity.
//!
//! The fetcher never fails: retries are bounded, and a page that cannot be
//! fetched ends the repository early with whatever was aggregated so far.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::config::IngestionConfig;
use crate::github::{CommitEntry, CommitPage, GitHubClient, GitHubError};
use crate::ingestion::{ActivityWindow, DailyActivity};

/// Result of fetching one repository's activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityFetch {
    Complete(Vec<DailyActivity>),
    /// Fetch stopped early; `activity` holds what was aggregated before the failure.
    Degraded {
        activity: Vec<DailyActivity>,
        reason: String,
    },
}

impl ActivityFetch {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ActivityFetch::Degraded { .. })
    }

    pub fn into_activity(self) -> Vec<DailyActivity> {
        match self {
            ActivityFetch::Complete(activity) | ActivityFetch::Degraded { activity, .. } => {
                activity
            }
        }
    }
}

#[async_trait]
pub trait ActivityFetcher: Send + Sync {
    /// Daily commit activity of `repo_full_name` over the last `window_days` days.
    async fn fetch_activity(&self, repo_full_name: &str, window_days: u32) -> ActivityFetch;
}

/// A commit entry lacking author name or date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCommit {
    pub index: usize,
    pub reason: &'static str,
}

/// Groups commits by calendar date within a window.
#[derive(Debug, Clone)]
pub struct ActivityAggregate {
    window: ActivityWindow,
    days: BTreeMap<NaiveDate, (u32, BTreeSet<String>)>,
}

impl ActivityAggregate {
    pub fn new(window: ActivityWindow) -> Self {
        Self {
            window,
            days: BTreeMap::new(),
        }
    }

    /// Fold a page of commits in. Returns the entries that had to be skipped.
    pub fn absorb(&mut self, entries: &[CommitEntry]) -> Vec<MalformedCommit> {
        let mut skipped = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let author = entry.commit.as_ref().and_then(|c| c.author.as_ref());
            let Some(author) = author else {
                skipped.push(MalformedCommit {
                    index,
                    reason: "missing commit author",
                });
                continue;
            };
            let Some(name) = author.name.as_deref() else {
                skipped.push(MalformedCommit {
                    index,
                    reason: "missing author name",
                });
                continue;
            };
            let Some(raw_date) = author.date.as_deref() else {
                skipped.push(MalformedCommit {
                    index,
                    reason: "missing author date",
                });
                continue;
            };
            let Ok(timestamp) = DateTime::parse_from_rfc3339(raw_date) else {
                skipped.push(MalformedCommit {
                    index,
                    reason: "unparseable author date",
                });
                continue;
            };

            let date = timestamp.with_timezone(&Utc).date_naive();
            if !self.window.contains(date) {
                debug!(%date, "Dropping commit outside activity window");
                continue;
            }

            let day = self.days.entry(date).or_default();
            day.0 += 1;
            day.1.insert(name.to_string());
        }

        skipped
    }

    /// Daily records in ascending date order.
    pub fn into_daily(self) -> Vec<DailyActivity> {
        self.days
            .into_iter()
            .map(|(date, (commits, authors))| DailyActivity {
                date,
                commits,
                authors,
            })
            .collect()
    }
}

/// Fetches commit activity from the GitHub commits endpoint.
#[derive(Debug, Clone)]
pub struct GitHubActivityFetcher {
    client: GitHubClient,
    max_attempts: u32,
    retry_delay: Duration,
    page_limit: u32,
}

impl GitHubActivityFetcher {
    pub fn new(client: GitHubClient, config: &IngestionConfig) -> Self {
        Self {
            client,
            max_attempts: config.fetch_max_attempts.max(1),
            retry_delay: config.retry_delay(),
            page_limit: config.commit_page_limit.max(1),
        }
    }

    /// Fetch activity over an explicit window.
    pub async fn fetch_window(&self, repo_full_name: &str, window: ActivityWindow) -> ActivityFetch {
        let mut aggregate = ActivityAggregate::new(window);

        let first = match self
            .client
            .commits_url(repo_full_name, &window.since(), &window.until())
        {
            Ok(url) => url,
            Err(err) => return self.degraded(repo_full_name, aggregate, err),
        };

        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages >= self.page_limit {
                debug!(
                    repo = repo_full_name,
                    page_limit = self.page_limit,
                    "Commit page limit reached"
                );
                break;
            }
            pages += 1;

            match self.fetch_page_with_retry(repo_full_name, url).await {
                Ok(page) => {
                    for skipped in aggregate.absorb(&page.commits) {
                        warn!(
                            repo = repo_full_name,
                            page = pages,
                            index = skipped.index,
                            reason = skipped.reason,
                            "Skipping malformed commit entry"
                        );
                    }
                    next = page.next;
                }
                Err(err) => return self.degraded(repo_full_name, aggregate, err),
            }
        }

        ActivityFetch::Complete(aggregate.into_daily())
    }

    async fn fetch_page_with_retry(
        &self,
        repo_full_name: &str,
        url: Url,
    ) -> Result<CommitPage, GitHubError> {
        let mut attempt = 1;
        loop {
            counter!("activity_fetch_attempts_total").increment(1);

            match self.client.commits_page(url.clone()).await {
                Ok(page) => return Ok(page),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        repo = repo_full_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Transient commit fetch failure, retrying"
                    );
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn degraded(
        &self,
        repo_full_name: &str,
        aggregate: ActivityAggregate,
        err: GitHubError,
    ) -> ActivityFetch {
        counter!("activity_fetch_degraded_total").increment(1);
        warn!(
            repo = repo_full_name,
            error = %err,
            transient = err.is_transient(),
            "Activity fetch degraded"
        );

        ActivityFetch::Degraded {
            activity: aggregate.into_daily(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl ActivityFetcher for GitHubActivityFetcher {
    async fn fetch_activity(&self, repo_full_name: &str, window_days: u32) -> ActivityFetch {
        self.fetch_window(repo_full_name, ActivityWindow::ending_today(window_days))
            .await
    }
}

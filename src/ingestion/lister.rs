//! Top-repository listing.

use async_trait::async_trait;
use tracing::info;

use crate::config::MAX_LISTING_LIMIT;
use crate::github::{GitHubClient, GitHubError};
use crate::ingestion::Repository;

/// Source of the current leaderboard, most-starred first.
#[async_trait]
pub trait RepositoryLister: Send + Sync {
    async fn list_top_repositories(&self) -> Result<Vec<Repository>, GitHubError>;
}

/// Lists repositories through the GitHub search endpoint. Single request, no retry.
#[derive(Debug, Clone)]
pub struct GitHubRepositoryLister {
    client: GitHubClient,
    limit: u32,
}

impl GitHubRepositoryLister {
    pub fn new(client: GitHubClient, limit: u32) -> Self {
        Self {
            client,
            limit: limit.clamp(1, MAX_LISTING_LIMIT),
        }
    }
}

#[async_trait]
impl RepositoryLister for GitHubRepositoryLister {
    async fn list_top_repositories(&self) -> Result<Vec<Repository>, GitHubError> {
        let items = self.client.search_top_repositories(self.limit).await?;
        let repositories: Vec<Repository> = items.into_iter().map(Repository::from).collect();

        info!(count = repositories.len(), "Listed top repositories");
        Ok(repositories)
    }
}

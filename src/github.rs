//! GitHub REST v3 client
//!
//! Thin transport over `reqwest` used by the repository lister and the
//! activity fetcher: search listing, paginated commit listing and error
//! classification.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::AppConfig;

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("ghstats/", env!("CARGO_PKG_VERSION"));

/// Errors raised while talking to the GitHub API
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request to GitHub timed out")]
    Timeout,

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response from GitHub: {0}")]
    MalformedResponse(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

impl GitHubError {
    /// Connection failures, timeouts, 5xx and 429 are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            GitHubError::Network(_) | GitHubError::Timeout => true,
            GitHubError::Api { status, .. } => *status >= 500 || *status == 429,
            GitHubError::MalformedResponse(_) | GitHubError::Url(_) => false,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GitHubError::Timeout
        } else {
            GitHubError::Network(err)
        }
    }
}

/// One entry of the repository search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRepository {
    pub full_name: String,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub watchers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub open_issues_count: u32,
    /// `None` for an explicit `null`; "Unknown" when the key is absent.
    #[serde(default = "unknown_language")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

fn unknown_language() -> Option<String> {
    Some("Unknown".to_string())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchRepository>,
}

/// One entry of the commits listing. Every nested field is optional so
/// incomplete entries can be skipped individually instead of failing the page.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitEntry {
    #[serde(default)]
    pub commit: Option<CommitDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// A single page of commits plus the `rel="next"` link, if any.
#[derive(Debug, Clone)]
pub struct CommitPage {
    pub commits: Vec<CommitEntry>,
    pub next: Option<Url>,
}

/// GitHub API client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client for `api_base` with a per-request timeout.
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GitHubError> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Url::parse(&api_base)?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(GitHubError::Network)?;

        Ok(Self {
            http,
            api_base,
            token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, GitHubError> {
        Self::new(
            config.github_api_base.clone(),
            config.github_token.clone(),
            config.ingestion.request_timeout(),
        )
    }

    /// Top repositories by star count, most-starred first.
    pub async fn search_top_repositories(
        &self,
        limit: u32,
    ) -> Result<Vec<SearchRepository>, GitHubError> {
        let mut url = Url::parse(&format!("{}/search/repositories", self.api_base))?;
        url.query_pairs_mut()
            .append_pair("q", "stars:>1")
            .append_pair("sort", "stars")
            .append_pair("order", "desc")
            .append_pair("per_page", &limit.to_string());

        let response = self.send(url).await?;
        let body = response.text().await.map_err(GitHubError::from_reqwest)?;

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| GitHubError::MalformedResponse(format!("search response: {}", e)))?;

        let mut items = parsed.items;
        items.truncate(limit as usize);
        Ok(items)
    }

    /// First-page URL of the commits listing for `full_name` between the given instants.
    pub fn commits_url(&self, full_name: &str, since: &str, until: &str) -> Result<Url, GitHubError> {
        let mut url = Url::parse(&format!("{}/repos/{}/commits", self.api_base, full_name))?;
        url.query_pairs_mut()
            .append_pair("since", since)
            .append_pair("until", until)
            .append_pair("per_page", "100");
        Ok(url)
    }

    /// Fetch one page of commits from `url` (a first-page URL or a `next` link).
    pub async fn commits_page(&self, url: Url) -> Result<CommitPage, GitHubError> {
        let response = self.send(url).await?;

        let next = response
            .headers()
            .get("Link")
            .and_then(|h| h.to_str().ok())
            .and_then(parse_link_header)
            .and_then(|raw| match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(link = %raw, error = %err, "Ignoring unparseable next link");
                    None
                }
            });

        let body = response.text().await.map_err(GitHubError::from_reqwest)?;
        let commits: Vec<CommitEntry> = serde_json::from_str(&body)
            .map_err(|e| GitHubError::MalformedResponse(format!("commits response: {}", e)))?;

        Ok(CommitPage { commits, next })
    }

    async fn send(&self, url: Url) -> Result<reqwest::Response, GitHubError> {
        debug!(url = %url, "GitHub request");

        let mut request = self.http.get(url).header("Accept", ACCEPT_HEADER);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(GitHubError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message: String = body.chars().take(200).collect();
        if status.as_u16() == 429 || status.as_u16() == 403 {
            warn!(status = status.as_u16(), "GitHub rate limit or permission error");
        }

        Err(GitHubError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Extract the `rel="next"` target from a GitHub `Link` header.
pub fn parse_link_header(link_header: &str) -> Option<String> {
    // <https://api.github.com/resource?page=2>; rel="next", <...>; rel="last"
    for link in link_header.split(',') {
        let parts: Vec<&str> = link.split(';').collect();
        if parts.len() < 2 {
            continue;
        }

        let url_part = parts[0].trim();
        if parts[1..].iter().any(|p| p.trim() == "rel=\"next\"")
            && let Some(start) = url_part.find('<')
            && let Some(end) = url_part.find('>')
        {
            return Some(url_part[start + 1..end].to_string());
        }
    }
    None
}

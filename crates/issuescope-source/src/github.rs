//! GitHub REST v3 issue source.

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, warn};

use issuescope_core::error::{IssueScopeError, Result};
use issuescope_core::traits::{FetchRequest, IssueBatch, IssueSource};
use issuescope_core::types::{Issue, IssueState, RepoMetadata};

const PER_PAGE: u32 = 100;
const MAX_PAGES: u32 = 10;
const USER_AGENT: &str = concat!("issuescope/", env!("CARGO_PKG_VERSION"));

/// Live GitHub API client.
pub struct GithubIssueSource {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GithubIssueSource {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            token,
        }
    }

    /// Accepts `owner/name` or a full `https://github.com/owner/name` URL.
    fn normalize_locator(locator: &str) -> String {
        locator
            .trim()
            .trim_start_matches("https://github.com/")
            .trim_start_matches("http://github.com/")
            .trim_end_matches(".git")
            .trim_matches('/')
            .to_string()
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    async fn fetch_metadata(&self, repo: &str) -> Result<RepoMetadata> {
        let url = format!("{}/repos/{}", self.api_base, repo);
        let response = self
            .request(&url)
            .send()
            .await
            .map_err(|e| IssueScopeError::Source(e.to_string()))?;

        match response.status().as_u16() {
            404 => return Err(IssueScopeError::RepositoryNotFound(repo.to_string())),
            403 | 429 => {
                let retry_after_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                return Err(IssueScopeError::RateLimited { retry_after_secs });
            }
            _ => {}
        }

        let wire: WireRepo = response
            .error_for_status()
            .map_err(|e| IssueScopeError::Source(e.to_string()))?
            .json()
            .await
            .map_err(|e| IssueScopeError::Source(e.to_string()))?;

        Ok(RepoMetadata {
            name: wire.name,
            full_name: wire.full_name,
            description: wire.description,
            stars: wire.stargazers_count,
            forks: wire.forks_count,
            open_issues: wire.open_issues_count,
            language: wire.language,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }

    async fn fetch_issues(&self, repo: &str, request: &FetchRequest) -> Result<Vec<Issue>> {
        let since = Utc::now() - Duration::days(request.window_days as i64);
        let state = if request.include_closed {
            "all"
        } else {
            "open"
        };

        let mut issues = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!(
                "{}/repos/{}/issues?state={}&since={}&per_page={}&page={}",
                self.api_base,
                repo,
                state,
                since.to_rfc3339(),
                PER_PAGE,
                page
            );

            let batch: Vec<WireIssue> = self
                .request(&url)
                .send()
                .await
                .map_err(|e| IssueScopeError::Source(e.to_string()))?
                .error_for_status()
                .map_err(|e| IssueScopeError::Source(e.to_string()))?
                .json()
                .await
                .map_err(|e| IssueScopeError::Source(e.to_string()))?;

            let batch_len = batch.len();
            for wire in batch {
                // The issues endpoint also returns pull requests.
                if wire.pull_request.is_some() {
                    continue;
                }
                if wire.created_at < since {
                    continue;
                }
                issues.push(wire.into_issue());
            }

            if batch_len < PER_PAGE as usize {
                break;
            }
            if page == MAX_PAGES {
                warn!(repo, "Issue listing truncated at {} pages", MAX_PAGES);
            }
        }

        issues.sort_by_key(|i| i.created_at);
        Ok(issues)
    }
}

impl IssueSource for GithubIssueSource {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<IssueBatch>> {
        Box::pin(async move {
            let repo = Self::normalize_locator(&request.repository);
            debug!(repo, window_days = request.window_days, "Fetching from GitHub");

            let repository = self.fetch_metadata(&repo).await?;
            let issues = self.fetch_issues(&repo, &request).await?;

            debug!(repo, issues = issues.len(), "GitHub fetch complete");
            Ok(IssueBatch { repository, issues })
        })
    }
}

// ── Wire types ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireRepo {
    name: String,
    full_name: String,
    description: Option<String>,
    stargazers_count: u64,
    forks_count: u64,
    open_issues_count: u64,
    language: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct WireLabel {
    name: String,
}

#[derive(Deserialize)]
struct WireUser {
    login: String,
}

#[derive(Deserialize)]
struct WireReactions {
    #[serde(default)]
    total_count: u32,
}

#[derive(Deserialize)]
struct WireIssue {
    id: u64,
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    labels: Vec<WireLabel>,
    #[serde(default)]
    assignees: Vec<WireUser>,
    user: Option<WireUser>,
    #[serde(default)]
    comments: u32,
    reactions: Option<WireReactions>,
    /// Present when the record is actually a pull request.
    pull_request: Option<serde_json::Value>,
}

impl WireIssue {
    fn into_issue(self) -> Issue {
        Issue {
            id: self.id,
            number: self.number,
            title: self.title,
            body: self.body,
            state: if self.state == "closed" {
                IssueState::Closed
            } else {
                IssueState::Open
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            assignees: self.assignees.into_iter().map(|u| u.login).collect(),
            author: self.user.map(|u| u.login).unwrap_or_else(|| "ghost".into()),
            comments_count: self.comments,
            reactions_count: self.reactions.map(|r| r.total_count).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_normalization() {
        assert_eq!(
            GithubIssueSource::normalize_locator("https://github.com/octo/repo"),
            "octo/repo"
        );
        assert_eq!(
            GithubIssueSource::normalize_locator("octo/repo.git"),
            "octo/repo"
        );
        assert_eq!(GithubIssueSource::normalize_locator(" octo/repo/ "), "octo/repo");
    }

    #[test]
    fn wire_issue_maps_fields() {
        let wire: WireIssue = serde_json::from_value(serde_json::json!({
            "id": 1, "number": 7, "title": "Crash on start",
            "state": "closed",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-02T00:00:00Z",
            "closed_at": "2026-01-02T00:00:00Z",
            "labels": [{"name": "bug"}],
            "assignees": [],
            "user": {"login": "dev_sarah"},
            "comments": 3,
            "reactions": {"total_count": 5}
        }))
        .unwrap();

        let issue = wire.into_issue();
        assert_eq!(issue.state, IssueState::Closed);
        assert_eq!(issue.labels, vec!["bug"]);
        assert_eq!(issue.author, "dev_sarah");
        assert_eq!(issue.reactions_count, 5);
    }
}

//! Issue sources: where analysis data comes from.
//!
//! Two [`IssueSource`] implementations live here. [`MockIssueSource`]
//! generates deterministic seeded data for demos and tests;
//! [`GithubIssueSource`] talks to the live GitHub REST API.

pub mod github;
pub mod mock;

use std::sync::Arc;

use issuescope_core::config::{SourceConfig, SourceMode};
use issuescope_core::traits::IssueSource;

pub use github::GithubIssueSource;
pub use mock::MockIssueSource;

/// Builds the configured issue source.
pub fn source_from_config(config: &SourceConfig) -> Arc<dyn IssueSource> {
    match config.mode {
        SourceMode::Mock => Arc::new(MockIssueSource::new()),
        SourceMode::Github => Arc::new(GithubIssueSource::new(
            config.api_base.clone(),
            config.github_token.clone(),
        )),
    }
}

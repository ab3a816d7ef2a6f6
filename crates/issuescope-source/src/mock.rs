//! Deterministic mock issue source.
//!
//! Generates realistic-looking repositories and issue batches without any
//! network access. Output is seeded from the repository name, so the same
//! locator always yields the same batch — demo sessions and tests stay
//! reproducible.

use chrono::{Duration, Utc};
use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use issuescope_core::error::Result;
use issuescope_core::traits::{FetchRequest, IssueBatch, IssueSource};
use issuescope_core::types::{Issue, IssueState, RepoMetadata};

const COMPONENTS: &[&str] = &[
    "authentication system",
    "user interface",
    "API endpoints",
    "database layer",
    "search functionality",
    "notification system",
    "settings panel",
    "data export",
    "reporting module",
    "plugin system",
    "code editor",
    "extension marketplace",
];

const FEATURES: &[&str] = &[
    "dark mode",
    "auto-save",
    "syntax highlighting",
    "real-time collaboration",
    "backup system",
    "search filters",
    "keyboard shortcuts",
    "drag and drop",
    "mobile support",
    "error logging",
    "user preferences",
    "data validation",
];

const ERROR_TYPES: &[&str] = &[
    "memory leak",
    "infinite loop",
    "timeout error",
    "authentication failure",
    "database connection error",
    "network timeout",
    "parsing error",
    "validation error",
];

const SECURITY_ISSUES: &[&str] = &[
    "potential XSS vulnerability",
    "SQL injection risk",
    "authentication bypass",
    "data exposure",
    "insecure API endpoint",
    "session hijacking risk",
];

const AUTHORS: &[&str] = &[
    "dev_sarah",
    "mike_coder",
    "alex_frontend",
    "backend_ninja",
    "qa_tester_lisa",
    "devops_guru",
    "tech_lead_john",
    "junior_dev_emma",
    "open_source_contributor",
    "bug_hunter_pro",
    "documentation_writer",
    "performance_optimizer",
];

const EXTRA_LABELS: &[&str] = &[
    "good first issue",
    "help wanted",
    "duplicate",
    "wontfix",
    "invalid",
];

const LANGUAGES: &[&str] = &["TypeScript", "Python", "JavaScript", "Java", "Go", "Rust"];

/// A weighted title/label template for one issue archetype.
struct IssueTemplate {
    title: &'static str,
    labels: &'static [&'static str],
    comments_range: (u32, u32),
    weight: f64,
}

const TEMPLATES: &[IssueTemplate] = &[
    IssueTemplate {
        title: "Bug: {feature} not working properly in {component}",
        labels: &["bug", "needs-investigation"],
        comments_range: (0, 8),
        weight: 0.35,
    },
    IssueTemplate {
        title: "Critical: {error_type} causing application crash",
        labels: &["bug", "critical", "urgent"],
        comments_range: (3, 15),
        weight: 0.05,
    },
    IssueTemplate {
        title: "Feature Request: Add {feature} to {component}",
        labels: &["enhancement", "feature-request"],
        comments_range: (1, 12),
        weight: 0.25,
    },
    IssueTemplate {
        title: "Enhancement: Improve {feature} performance",
        labels: &["enhancement", "performance"],
        comments_range: (0, 6),
        weight: 0.15,
    },
    IssueTemplate {
        title: "Documentation: Update {component} documentation",
        labels: &["documentation"],
        comments_range: (0, 4),
        weight: 0.08,
    },
    IssueTemplate {
        title: "Security: {security_issue} in {component}",
        labels: &["security", "urgent"],
        comments_range: (2, 10),
        weight: 0.03,
    },
    IssueTemplate {
        title: "Question: How to use {feature}?",
        labels: &["question", "help wanted"],
        comments_range: (1, 8),
        weight: 0.09,
    },
];

/// Generates seeded repository and issue data.
pub struct MockIssueSource;

impl MockIssueSource {
    pub fn new() -> Self {
        Self
    }

    fn repo_name(locator: &str) -> &str {
        locator.rsplit('/').next().unwrap_or(locator)
    }

    // FNV-1a, so seeds stay stable across Rust releases.
    fn name_seed(name: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in name.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100_0000_01b3);
        }
        hash
    }

    fn generate_metadata(&self, locator: &str, rng: &mut StdRng) -> RepoMetadata {
        let name = Self::repo_name(locator).to_string();
        let seed = Self::name_seed(&name);
        let now = Utc::now();

        RepoMetadata {
            description: Some(format!(
                "A comprehensive {} project with advanced features and community support",
                name
            )),
            stars: 1_000 + seed % 50_000,
            forks: 100 + seed % 5_000,
            open_issues: 50 + seed % 200,
            language: Some((*LANGUAGES.choose(rng).unwrap_or(&"Rust")).to_string()),
            created_at: now - Duration::days(365 + (seed % 1_000) as i64),
            updated_at: now - Duration::days((seed % 30) as i64),
            name,
            full_name: locator.to_string(),
        }
    }

    fn pick_template(rng: &mut StdRng) -> &'static IssueTemplate {
        let roll: f64 = rng.gen();
        let mut cumulative = 0.0;
        for template in TEMPLATES {
            cumulative += template.weight;
            if roll <= cumulative {
                return template;
            }
        }
        &TEMPLATES[0]
    }

    fn render_title(template: &IssueTemplate, rng: &mut StdRng) -> String {
        template
            .title
            .replace("{feature}", FEATURES.choose(rng).unwrap_or(&"search"))
            .replace("{component}", COMPONENTS.choose(rng).unwrap_or(&"core"))
            .replace("{error_type}", ERROR_TYPES.choose(rng).unwrap_or(&"error"))
            .replace(
                "{security_issue}",
                SECURITY_ISSUES.choose(rng).unwrap_or(&"vulnerability"),
            )
    }

    fn generate_issues(&self, request: &FetchRequest, rng: &mut StdRng) -> Vec<Issue> {
        let name = Self::repo_name(&request.repository);
        let seed = Self::name_seed(name);
        let days = request.window_days.max(1);

        let base_count = 50 + (seed % 200) as u32;
        let count = (base_count as u64 * days as u64 / 90).max(1) as usize;

        let now = Utc::now();
        let mut issues = Vec::with_capacity(count);

        for i in 0..count {
            // Temporal clustering: 30% of issues land in the most recent month.
            let days_ago: u32 = if rng.gen_bool(0.3) {
                rng.gen_range(0..=days.min(30))
            } else {
                rng.gen_range(0..=days)
            };
            let created_at = now
                - Duration::days(days_ago as i64)
                - Duration::hours(rng.gen_range(0..24))
                - Duration::minutes(rng.gen_range(0..60));

            let template = Self::pick_template(rng);
            let title = Self::render_title(template, rng);

            let mut labels: Vec<String> = template.labels.iter().map(|l| l.to_string()).collect();
            if rng.gen_bool(0.2) {
                labels.push((*EXTRA_LABELS.choose(rng).unwrap_or(&"help wanted")).to_string());
            }

            // Roughly 60% of issues have been closed.
            let closed_at = if rng.gen_bool(0.6) {
                let delay = rng.gen_range(1..=(days.saturating_sub(days_ago)).max(1));
                let closed = created_at + Duration::days(delay as i64);
                Some(closed.min(now))
            } else {
                None
            };

            if closed_at.is_some() && !request.include_closed {
                continue;
            }

            let (min_c, max_c) = template.comments_range;
            let mut comments_count = rng.gen_range(min_c..=max_c);
            if labels.iter().any(|l| l == "critical" || l == "urgent") {
                comments_count += rng.gen_range(2..=8);
            }
            if days_ago > 30 {
                comments_count += rng.gen_range(0..=5);
            }

            let assignees = if rng.gen_bool(0.3) {
                vec![(*AUTHORS.choose(rng).unwrap_or(&"maintainer")).to_string()]
            } else {
                Vec::new()
            };

            issues.push(Issue {
                id: 100_000 + i as u64,
                number: i as u64 + 1,
                title,
                body: None,
                state: if closed_at.is_some() {
                    IssueState::Closed
                } else {
                    IssueState::Open
                },
                created_at,
                updated_at: closed_at.unwrap_or(created_at),
                closed_at,
                labels,
                assignees,
                author: (*AUTHORS.choose(rng).unwrap_or(&"contributor")).to_string(),
                comments_count,
                reactions_count: rng.gen_range(0..=(comments_count + 2).min(10)),
            });
        }

        issues.sort_by_key(|i| i.created_at);
        issues
    }
}

impl Default for MockIssueSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueSource for MockIssueSource {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<IssueBatch>> {
        Box::pin(async move {
            let seed = Self::name_seed(Self::repo_name(&request.repository));
            let mut rng = StdRng::seed_from_u64(seed);

            let repository = self.generate_metadata(&request.repository, &mut rng);
            let issues = self.generate_issues(&request, &mut rng);

            debug!(
                repository = %request.repository,
                issues = issues.len(),
                "Generated mock issue batch"
            );

            Ok(IssueBatch { repository, issues })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(repo: &str, days: u32, include_closed: bool) -> FetchRequest {
        FetchRequest {
            repository: repo.into(),
            window_days: days,
            include_closed,
        }
    }

    #[tokio::test]
    async fn same_locator_same_batch() {
        let source = MockIssueSource::new();
        let a = source.fetch(request("octo/demo", 90, true)).await.unwrap();
        let b = source.fetch(request("octo/demo", 90, true)).await.unwrap();

        assert_eq!(a.issues.len(), b.issues.len());
        assert_eq!(a.repository.stars, b.repository.stars);
        assert_eq!(a.issues[0].title, b.issues[0].title);
    }

    #[tokio::test]
    async fn issues_sorted_by_creation() {
        let source = MockIssueSource::new();
        let batch = source.fetch(request("octo/demo", 90, true)).await.unwrap();
        assert!(batch
            .issues
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn open_only_excludes_closed() {
        let source = MockIssueSource::new();
        let batch = source.fetch(request("octo/demo", 90, false)).await.unwrap();
        assert!(batch.issues.iter().all(|i| i.state == IssueState::Open));
    }

    #[tokio::test]
    async fn window_scales_volume() {
        let source = MockIssueSource::new();
        let short = source.fetch(request("octo/demo", 30, true)).await.unwrap();
        let long = source.fetch(request("octo/demo", 180, true)).await.unwrap();
        assert!(short.issues.len() < long.issues.len());
    }
}

//! Collaborator seams of the workflow core.
//!
//! The orchestration engine treats data retrieval, trend analysis, and
//! narrative synthesis as replaceable capabilities behind these traits. Every
//! narrative payload pairs the trait call with a deterministic `fallback`
//! constructor, so a malformed or unavailable generator can never stall the
//! pipeline.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};
use crate::report::{ActionPlan, ExecutiveSummary, TechnicalAnalysis};
use crate::types::{Issue, RepoMetadata, TrendDirection, TrendSummary};

/// Parameters of one issue-retrieval call.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// `owner/name` repository locator (full GitHub URLs are accepted and
    /// normalized by the source).
    pub repository: String,
    /// Analysis window length in days, counted back from now.
    pub window_days: u32,
    pub include_closed: bool,
}

/// A repository's metadata plus its time-ordered issue collection.
#[derive(Debug, Clone)]
pub struct IssueBatch {
    pub repository: RepoMetadata,
    /// Ordered by creation time, oldest first.
    pub issues: Vec<Issue>,
}

/// Issue source — supplies the raw data the pipeline runs on.
///
/// An empty batch is a valid (degraded) result; only transport or lookup
/// failures are errors.
pub trait IssueSource: Send + Sync + 'static {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<IssueBatch>>;
}

/// Trend analysis — consumes the time-ordered issue collection, returns a
/// trend summary. Internals (fitting, forecasting, scoring) are the
/// collaborator's business.
pub trait TrendAnalyzer: Send + Sync + 'static {
    fn analyze<'a>(
        &'a self,
        issues: &'a [Issue],
        window_days: u32,
    ) -> BoxFuture<'a, Result<TrendSummary>>;
}

/// Coarse three-step level used across insight payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "high",
            Level::Medium => "medium",
            Level::Low => "low",
        }
    }
}

/// Structured metrics handed to the narrative synthesizer for insight
/// generation. Counting only — no statistics, no text.
#[derive(Debug, Clone)]
pub struct InsightContext {
    pub repository: String,
    pub total_issues: usize,
    pub open_issues: usize,
    pub recent_issues_30d: usize,
    pub unique_authors: usize,
    pub avg_comments: f64,
    pub bug_issues: usize,
    pub security_issues: usize,
    /// Open issues older than 90 days.
    pub stale_open_issues: usize,
    pub trend: TrendSummary,
}

impl InsightContext {
    pub fn open_ratio(&self) -> f64 {
        if self.total_issues == 0 {
            0.0
        } else {
            self.open_issues as f64 / self.total_issues as f64
        }
    }

    pub fn bug_ratio(&self) -> f64 {
        if self.total_issues == 0 {
            0.0
        } else {
            self.bug_issues as f64 / self.total_issues as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthInsight {
    /// 1..=10.
    pub health_score: u8,
    pub positive_indicators: Vec<String>,
    pub concerns: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceInsight {
    pub load_assessment: Level,
    /// 0..=10, higher means more accumulated debt.
    pub debt_score: f64,
    pub recommendations: Vec<String>,
    pub priority_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityInsight {
    /// 1..=10.
    pub health_score: u8,
    pub engagement_level: Level,
    pub unique_contributors: usize,
    pub growth_opportunities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicInsight {
    pub priorities: Vec<String>,
    pub roadmap_impact: String,
    pub process_improvements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskInsight {
    pub overall_risk: Level,
    pub top_risks: Vec<String>,
    pub opportunities: Vec<String>,
    pub recommended_actions: Vec<String>,
}

/// The full structured insight payload, one schema'd record per category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightBundle {
    pub health: HealthInsight,
    pub maintenance: MaintenanceInsight,
    pub community: CommunityInsight,
    pub strategic: StrategicInsight,
    pub risks: RiskInsight,
}

impl InsightBundle {
    pub const CATEGORIES: [&'static str; 5] =
        ["health", "maintenance", "community", "strategic", "risks"];

    /// Deterministic conservative payload, used whenever the synthesizer
    /// errors. Intentionally template-like: real signal belongs to the
    /// synthesizer, this only has to be well-formed and honest about volume.
    pub fn fallback(ctx: &InsightContext) -> Self {
        Self {
            health: HealthInsight {
                health_score: 7,
                positive_indicators: vec!["Active issue tracking".into()],
                concerns: Vec::new(),
                summary: format!(
                    "Limited assessment from {} issues; full synthesis unavailable.",
                    ctx.total_issues
                ),
            },
            maintenance: MaintenanceInsight {
                load_assessment: Level::Medium,
                debt_score: 5.0,
                recommendations: vec!["Implement automated issue triage".into()],
                priority_areas: vec!["Bug fixes".into(), "Documentation updates".into()],
            },
            community: CommunityInsight {
                health_score: 5,
                engagement_level: Level::Medium,
                unique_contributors: ctx.unique_authors,
                growth_opportunities: vec!["Improve contributor documentation".into()],
            },
            strategic: StrategicInsight {
                priorities: vec![
                    "Address issue backlog systematically".into(),
                    "Improve community engagement".into(),
                    "Implement better monitoring".into(),
                ],
                roadmap_impact: "Consider issue trends in product planning".into(),
                process_improvements: vec!["Automated issue labeling".into()],
            },
            risks: RiskInsight {
                overall_risk: Level::Medium,
                top_risks: Vec::new(),
                opportunities: vec!["Implement automation tools".into()],
                recommended_actions: vec!["Regular issue triage".into()],
            },
        }
    }
}

/// Structured inputs for report narrative generation.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub repository: String,
    pub window_days: u32,
    pub total_issues: usize,
    pub open_issues: usize,
    pub trend: TrendSummary,
    pub insights: Option<InsightBundle>,
}

/// The narrative sections of a final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportNarrative {
    pub executive_summary: ExecutiveSummary,
    pub technical_analysis: TechnicalAnalysis,
    pub action_plan: ActionPlan,
}

impl ReportNarrative {
    /// Deterministic narrative used whenever the synthesizer errors.
    pub fn fallback(ctx: &ReportContext) -> Self {
        let direction = ctx.trend.direction;
        Self {
            executive_summary: ExecutiveSummary {
                overview: format!(
                    "Analysis of {} over {} days: {} issues, {} trend.",
                    ctx.repository,
                    ctx.window_days,
                    ctx.total_issues,
                    direction.as_str()
                ),
                key_findings: vec![
                    format!(
                        "Repository contains {} issues over the {}-day period",
                        ctx.total_issues, ctx.window_days
                    ),
                    format!("Issue trend is {}", direction.as_str()),
                ],
                business_impact: "Issue activity patterns inform resource allocation.".into(),
                recommendations: vec![
                    "Implement systematic issue triage".into(),
                    "Monitor trends for early warning signs".into(),
                ],
            },
            technical_analysis: TechnicalAnalysis {
                methodology: "Rule-based synthesis from statistical trend metrics".into(),
                trend_direction: Some(direction),
                confidence_score: ctx.trend.confidence,
                anomalies_detected: ctx.trend.anomalies.len(),
                seasonal_patterns_found: !ctx.trend.seasonal.is_empty(),
                patterns_identified: Vec::new(),
                technical_recommendations: vec!["Set up monitoring dashboards".into()],
            },
            action_plan: ActionPlan {
                immediate_actions: vec!["Review current issue management workflow".into()],
                short_term_actions: vec!["Establish a triage process".into()],
                long_term_actions: vec!["Develop comprehensive monitoring".into()],
                success_metrics: vec!["Reduced average issue resolution time".into()],
            },
        }
    }
}

/// Narrative synthesis — turns structured metrics into structured text.
///
/// The two-path contract: either a well-formed payload, or a
/// `GenerationError` the caller answers with the payload's `fallback`. Parse
/// failures inside an implementation must be absorbed into
/// `GenerationError::Malformed` — the core never sees raw parse errors.
pub trait NarrativeSynthesizer: Send + Sync + 'static {
    fn insights(
        &self,
        ctx: InsightContext,
    ) -> BoxFuture<'_, std::result::Result<InsightBundle, GenerationError>>;

    fn report(
        &self,
        ctx: ReportContext,
    ) -> BoxFuture<'_, std::result::Result<ReportNarrative, GenerationError>>;
}

/// Overall risk level helper shared by dashboard assembly.
pub fn risk_label(direction: TrendDirection, open_ratio: f64, security_issues: usize) -> Level {
    let mut factors = 0;
    if open_ratio > 0.7 {
        factors += 1;
    }
    if direction == TrendDirection::Increasing {
        factors += 1;
    }
    if security_issues > 0 {
        factors += 1;
    }
    match factors {
        0 => Level::Low,
        1 | 2 => Level::Medium,
        _ => Level::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrendSummary;

    fn ctx(total: usize) -> InsightContext {
        InsightContext {
            repository: "octo/repo".into(),
            total_issues: total,
            open_issues: total / 2,
            recent_issues_30d: total / 3,
            unique_authors: 4,
            avg_comments: 1.5,
            bug_issues: total / 4,
            security_issues: 0,
            stale_open_issues: 0,
            trend: TrendSummary::degraded(90),
        }
    }

    #[test]
    fn open_ratio_handles_empty() {
        assert_eq!(ctx(0).open_ratio(), 0.0);
        assert_eq!(ctx(10).open_ratio(), 0.5);
    }

    #[test]
    fn fallback_bundle_reflects_volume() {
        let bundle = InsightBundle::fallback(&ctx(42));
        assert!(bundle.health.summary.contains("42"));
        assert_eq!(bundle.community.unique_contributors, 4);
    }

    #[test]
    fn risk_label_saturates() {
        assert_eq!(risk_label(TrendDirection::Stable, 0.1, 0), Level::Low);
        assert_eq!(risk_label(TrendDirection::Increasing, 0.8, 0), Level::Medium);
        assert_eq!(risk_label(TrendDirection::Increasing, 0.8, 3), Level::High);
    }
}

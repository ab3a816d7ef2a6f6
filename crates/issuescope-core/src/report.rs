//! Final-report model.
//!
//! A run always ends with a fully-populated `FinalReport` on the state —
//! full, fallback, or minimal — so callers distinguish success from
//! degradation via `metadata.status`, never via an absent report or an
//! escaped error.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DataQuality, Insight, Recommendation, StageId, TrendDirection};

/// Declared completion status of a final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// All stages ran to completion.
    Completed,
    /// Produced by the error handler from partial state.
    FallbackCompletion,
    /// Produced by the orchestrator after a catastrophic driver failure.
    WorkflowFailed,
}

/// Confidence score attached to every fallback report. Fixed, so degraded
/// results are distinguishable from any analyzed confidence (0.2/0.4/0.6/0.8).
pub const FALLBACK_CONFIDENCE: f64 = 0.75;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub repository: String,
    pub analysis_date: DateTime<Utc>,
    pub analysis_period_days: u32,
    pub total_issues_analyzed: usize,
    pub session_id: String,
    pub confidence_score: f64,
    pub status: ReportStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub overview: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    pub business_impact: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub methodology: String,
    pub trend_direction: Option<TrendDirection>,
    pub confidence_score: f64,
    pub anomalies_detected: usize,
    pub seasonal_patterns_found: bool,
    #[serde(default)]
    pub patterns_identified: Vec<String>,
    #[serde(default)]
    pub technical_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionPlan {
    #[serde(default)]
    pub immediate_actions: Vec<String>,
    #[serde(default)]
    pub short_term_actions: Vec<String>,
    #[serde(default)]
    pub long_term_actions: Vec<String>,
    #[serde(default)]
    pub success_metrics: Vec<String>,
}

/// Day-bucketed and month-bucketed issue counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    #[serde(default)]
    pub daily_issues: BTreeMap<String, u32>,
    #[serde(default)]
    pub monthly_issues: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Distributions {
    #[serde(default)]
    pub issue_states: BTreeMap<String, u32>,
    #[serde(default)]
    pub top_labels: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_issues: usize,
    pub open_issues: usize,
    pub trend_direction: Option<TrendDirection>,
    pub health_score: u8,
    pub risk_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardData {
    pub time_series: TimeSeries,
    pub distributions: Distributions,
    pub summary_metrics: SummaryMetrics,
    /// True when the buckets are placeholders synthesized by the error
    /// handler rather than derived from retrieved issues.
    #[serde(default)]
    pub synthetic: bool,
    pub generated_at: DateTime<Utc>,
}

/// Enumeration of failed stages and whatever partial results survived.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorSummary {
    #[serde(default)]
    pub failed_agents: Vec<StageId>,
    #[serde(default)]
    pub error_messages: HashMap<StageId, String>,
    pub issues_retrieved: usize,
    pub insights_generated: usize,
    pub recommendations_generated: usize,
    #[serde(default)]
    pub recovery_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualitySubScores {
    pub data_coverage: f64,
    pub insight_quality: f64,
    pub recommendation_quality: f64,
}

/// Meta-analysis of one workflow execution, attached by the reflection stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReflection {
    /// Weighted saturating composite in [0, 1].
    pub workflow_score: f64,
    pub successful_agents: Vec<StageId>,
    pub failed_agents: Vec<StageId>,
    pub routing_path: Vec<String>,
    pub data_quality: Option<DataQuality>,
    pub total_execution_secs: f64,
    pub quality_metrics: QualitySubScores,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
}

/// The single report structure assembled at the end of every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    pub metadata: ReportMetadata,
    pub executive_summary: ExecutiveSummary,
    pub technical_analysis: TechnicalAnalysis,
    pub action_plan: ActionPlan,
    pub dashboard: DashboardData,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<ErrorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<WorkflowReflection>,
}

impl FinalReport {
    /// Bare-minimum report for catastrophic driver failures, when even
    /// fallback synthesis could not run.
    pub fn minimal(
        repository: impl Into<String>,
        session_id: impl Into<String>,
        window_days: u32,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        Self {
            metadata: ReportMetadata {
                repository: repository.into(),
                analysis_date: Utc::now(),
                analysis_period_days: window_days,
                total_issues_analyzed: 0,
                session_id: session_id.into(),
                confidence_score: 0.0,
                status: ReportStatus::WorkflowFailed,
            },
            executive_summary: ExecutiveSummary {
                overview: format!("Workflow failed before producing results: {}", error),
                ..Default::default()
            },
            technical_analysis: TechnicalAnalysis::default(),
            action_plan: ActionPlan::default(),
            dashboard: DashboardData {
                synthetic: true,
                generated_at: Utc::now(),
                ..Default::default()
            },
            insights: Vec::new(),
            recommendations: Vec::new(),
            error_summary: Some(ErrorSummary {
                recovery_suggestions: vec![error],
                ..Default::default()
            }),
            reflection: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_report_declares_failure() {
        let report = FinalReport::minimal("octo/repo", "sess-1", 90, "driver blew up");
        assert_eq!(report.metadata.status, ReportStatus::WorkflowFailed);
        assert!(report.dashboard.synthetic);
        assert!(report
            .error_summary
            .unwrap()
            .recovery_suggestions
            .iter()
            .any(|s| s.contains("driver blew up")));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ReportStatus::FallbackCompletion).unwrap();
        assert_eq!(json, "\"fallback_completion\"");
    }
}

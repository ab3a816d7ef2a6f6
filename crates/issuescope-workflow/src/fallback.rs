//! Error handler stage: fallback report assembly.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use futures::future::BoxFuture;
use tracing::warn;

use issuescope_core::report::{
    ActionPlan, DashboardData, Distributions, ErrorSummary, ExecutiveSummary, FinalReport,
    ReportMetadata, ReportStatus, SummaryMetrics, TechnicalAnalysis, TimeSeries,
    FALLBACK_CONFIDENCE,
};
use issuescope_core::types::{StageId, StageStatus};

use crate::agents::report::build_dashboard;
use crate::stage::Stage;
use crate::state::WorkflowState;

/// Builds a degraded-but-complete report out of whatever partial state the
/// run accumulated before failing. Runs that reach this stage still finish
/// at 100% with a structured result.
pub struct ErrorHandler;

impl ErrorHandler {
    pub fn new() -> Self {
        Self
    }

    fn recovery_suggestions(state: &WorkflowState) -> Vec<String> {
        let mut suggestions = Vec::new();
        for agent in state.failed_agents() {
            match agent {
                StageId::DataRetrieval => {
                    suggestions.push(
                        "Verify the repository locator and source credentials, then retry"
                            .to_string(),
                    );
                }
                StageId::Analysis => {
                    suggestions.push(
                        "Widen the analysis window to collect more issues".to_string(),
                    );
                }
                StageId::InsightGeneration | StageId::ReportGeneration => {
                    suggestions
                        .push("Check narrative synthesizer availability and retry".to_string());
                }
                _ => {}
            }
        }
        if suggestions.is_empty() {
            suggestions.push("Retry the analysis with the same parameters".to_string());
        }
        suggestions
    }

    /// Placeholder buckets for runs where no issues survived. Clearly marked
    /// so clients never chart synthetic numbers as real.
    fn synthetic_dashboard(state: &WorkflowState) -> DashboardData {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let month = Utc::now().format("%Y-%m").to_string();

        DashboardData {
            time_series: TimeSeries {
                daily_issues: BTreeMap::from([(today, 0)]),
                monthly_issues: BTreeMap::from([(month, 0)]),
            },
            distributions: Distributions {
                issue_states: BTreeMap::from([("open".to_string(), 0), ("closed".to_string(), 0)]),
                top_labels: BTreeMap::new(),
            },
            summary_metrics: SummaryMetrics {
                total_issues: 0,
                open_issues: 0,
                trend_direction: state.trend_summary.as_ref().map(|t| t.direction),
                health_score: 0,
                risk_level: "unknown".to_string(),
            },
            synthetic: true,
            generated_at: Utc::now(),
        }
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ErrorHandler {
    fn id(&self) -> StageId {
        StageId::ErrorHandler
    }

    fn execute(&self, mut state: WorkflowState) -> BoxFuture<'_, WorkflowState> {
        Box::pin(async move {
            state.set_stage_status(StageId::ErrorHandler, StageStatus::Running);

            let failed_agents = state.failed_agents();
            let error_messages: HashMap<StageId, String> = state
                .stage_errors
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect();

            warn!(
                session_id = %state.session_id,
                failed = ?failed_agents,
                "Assembling fallback report from partial results"
            );

            let dashboard = if state.issues.is_empty() {
                Self::synthetic_dashboard(&state)
            } else {
                build_dashboard(&state)
            };

            let error_summary = ErrorSummary {
                failed_agents: failed_agents.clone(),
                error_messages,
                issues_retrieved: state.issues.len(),
                insights_generated: state.insights.len(),
                recommendations_generated: state.recommendations.len(),
                recovery_suggestions: Self::recovery_suggestions(&state),
            };

            let failed_names: Vec<&str> =
                failed_agents.iter().map(|a| a.as_str()).collect();

            let report = FinalReport {
                metadata: ReportMetadata {
                    repository: state.inputs.repository.clone(),
                    analysis_date: Utc::now(),
                    analysis_period_days: state.inputs.window_days,
                    total_issues_analyzed: state.issues.len(),
                    session_id: state.session_id.to_string(),
                    confidence_score: FALLBACK_CONFIDENCE,
                    status: ReportStatus::FallbackCompletion,
                },
                executive_summary: ExecutiveSummary {
                    overview: format!(
                        "Analysis of {} completed with degraded results: {} of 4 agents failed ({}).",
                        state.inputs.repository,
                        failed_agents.len(),
                        if failed_names.is_empty() {
                            "routing failure".to_string()
                        } else {
                            failed_names.join(", ")
                        }
                    ),
                    key_findings: vec![
                        format!("{} issues were retrieved before failure", state.issues.len()),
                        format!("{} insights survived", state.insights.len()),
                    ],
                    business_impact:
                        "Results are partial; treat conclusions as directional only.".to_string(),
                    recommendations: error_summary.recovery_suggestions.clone(),
                },
                technical_analysis: TechnicalAnalysis {
                    methodology: "Fallback assembly from partial pipeline state".to_string(),
                    trend_direction: state.trend_summary.as_ref().map(|t| t.direction),
                    confidence_score: FALLBACK_CONFIDENCE,
                    anomalies_detected: state
                        .trend_summary
                        .as_ref()
                        .map(|t| t.anomalies.len())
                        .unwrap_or(0),
                    seasonal_patterns_found: state
                        .trend_summary
                        .as_ref()
                        .map(|t| !t.seasonal.is_empty())
                        .unwrap_or(false),
                    patterns_identified: Vec::new(),
                    technical_recommendations: vec![
                        "Re-run once the failed stage's collaborator is healthy".to_string(),
                    ],
                },
                action_plan: ActionPlan {
                    immediate_actions: error_summary.recovery_suggestions.clone(),
                    ..Default::default()
                },
                dashboard,
                insights: state.insights.clone(),
                recommendations: state.recommendations.clone(),
                error_summary: Some(error_summary),
                reflection: None,
            };

            state.final_report = Some(report);
            state.update_progress("error_recovery", 100.0, "Fallback report assembled");
            state.set_stage_status(StageId::ErrorHandler, StageStatus::Completed);
            state
        })
    }
}

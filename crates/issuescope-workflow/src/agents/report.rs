//! Report generation agent.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use tracing::{info, warn};

use issuescope_core::error::GenerationError;
use issuescope_core::report::{
    DashboardData, Distributions, FinalReport, ReportMetadata, ReportStatus, SummaryMetrics,
    TimeSeries,
};
use issuescope_core::traits::{risk_label, NarrativeSynthesizer, ReportContext, ReportNarrative};
use issuescope_core::types::{StageId, StageOutput, StageStatus, TrendSummary};

use crate::stage::Stage;
use crate::state::WorkflowState;

/// Assembles the final report from everything earlier stages produced.
pub struct ReportAgent {
    synthesizer: Arc<dyn NarrativeSynthesizer>,
}

impl ReportAgent {
    pub fn new(synthesizer: Arc<dyn NarrativeSynthesizer>) -> Self {
        Self { synthesizer }
    }
}

/// Day/month buckets, state and label distributions derived from the
/// retrieved issues. Shared with the error handler, which labels its copy
/// synthetic when no issues survived.
pub fn build_dashboard(state: &WorkflowState) -> DashboardData {
    let mut daily_issues: BTreeMap<String, u32> = BTreeMap::new();
    let mut monthly_issues: BTreeMap<String, u32> = BTreeMap::new();
    let mut issue_states: BTreeMap<String, u32> = BTreeMap::new();
    let mut label_counts: BTreeMap<String, u32> = BTreeMap::new();

    for issue in &state.issues {
        *daily_issues
            .entry(issue.created_at.format("%Y-%m-%d").to_string())
            .or_insert(0) += 1;
        *monthly_issues
            .entry(issue.created_at.format("%Y-%m").to_string())
            .or_insert(0) += 1;
        let bucket = if issue.is_open() { "open" } else { "closed" };
        *issue_states.entry(bucket.to_string()).or_insert(0) += 1;
        for label in &issue.labels {
            *label_counts.entry(label.clone()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, u32)> = label_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_labels: BTreeMap<String, u32> = ranked.into_iter().take(10).collect();

    let open_issues = state.issues.iter().filter(|i| i.is_open()).count();
    let total_issues = state.issues.len();
    let open_ratio = if total_issues == 0 {
        0.0
    } else {
        open_issues as f64 / total_issues as f64
    };

    let trend_direction = state.trend_summary.as_ref().map(|t| t.direction);
    let security_issues = state
        .issues
        .iter()
        .filter(|i| i.has_label("security"))
        .count();
    let risk = state
        .trend_summary
        .as_ref()
        .map(|t| risk_label(t.direction, open_ratio, security_issues))
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let health_score = state
        .insight_bundle
        .as_ref()
        .map(|b| b.health.health_score)
        .unwrap_or(5);

    DashboardData {
        time_series: TimeSeries {
            daily_issues,
            monthly_issues,
        },
        distributions: Distributions {
            issue_states,
            top_labels,
        },
        summary_metrics: SummaryMetrics {
            total_issues,
            open_issues,
            trend_direction,
            health_score,
            risk_level: risk,
        },
        synthetic: false,
        generated_at: Utc::now(),
    }
}

impl Stage for ReportAgent {
    fn id(&self) -> StageId {
        StageId::ReportGeneration
    }

    fn execute(&self, mut state: WorkflowState) -> BoxFuture<'_, WorkflowState> {
        Box::pin(async move {
            state.set_stage_status(StageId::ReportGeneration, StageStatus::Running);
            state.log_stage_progress(StageId::ReportGeneration, 40.0, "Assembling final report");

            let window_days = state.inputs.window_days;
            let trend = state
                .trend_summary
                .clone()
                .unwrap_or_else(|| TrendSummary::degraded(window_days));

            let ctx = ReportContext {
                repository: state.inputs.repository.clone(),
                window_days,
                total_issues: state.issues.len(),
                open_issues: state.issues.iter().filter(|i| i.is_open()).count(),
                trend: trend.clone(),
                insights: state.insight_bundle.clone(),
            };

            let narrative = match self.synthesizer.report(ctx.clone()).await {
                Ok(narrative) => narrative,
                Err(GenerationError::Malformed(reason)) => {
                    warn!(
                        session_id = %state.session_id,
                        reason,
                        "Report synthesis returned malformed payload, using fallback narrative"
                    );
                    ReportNarrative::fallback(&ctx)
                }
                Err(GenerationError::Unavailable(reason)) => {
                    warn!(
                        session_id = %state.session_id,
                        reason,
                        "Report synthesis unavailable"
                    );
                    state.set_stage_error(StageId::ReportGeneration, reason);
                    state.set_stage_status(StageId::ReportGeneration, StageStatus::Failed);
                    return state;
                }
            };

            let report = FinalReport {
                metadata: ReportMetadata {
                    repository: state.inputs.repository.clone(),
                    analysis_date: Utc::now(),
                    analysis_period_days: window_days,
                    total_issues_analyzed: state.issues.len(),
                    session_id: state.session_id.to_string(),
                    confidence_score: trend.confidence,
                    status: ReportStatus::Completed,
                },
                executive_summary: narrative.executive_summary,
                technical_analysis: narrative.technical_analysis,
                action_plan: narrative.action_plan,
                dashboard: build_dashboard(&state),
                insights: state.insights.clone(),
                recommendations: state.recommendations.clone(),
                error_summary: None,
                reflection: None,
            };

            info!(
                session_id = %state.session_id,
                confidence = report.metadata.confidence_score,
                "Final report assembled"
            );

            state.set_stage_output(
                StageId::ReportGeneration,
                StageOutput::Report {
                    sections: vec![
                        "executive_summary".into(),
                        "technical_analysis".into(),
                        "action_plan".into(),
                        "dashboard".into(),
                    ],
                    confidence: report.metadata.confidence_score,
                },
            );
            state.log_stage_progress(StageId::ReportGeneration, 100.0, "Report generation complete");
            state.final_report = Some(report);
            state.set_stage_status(StageId::ReportGeneration, StageStatus::Completed);
            state
        })
    }
}

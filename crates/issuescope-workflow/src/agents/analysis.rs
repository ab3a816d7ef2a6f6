//! Trend analysis agent.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{error, info};

use issuescope_core::traits::TrendAnalyzer;
use issuescope_core::types::{Priority, StageId, StageOutput, StageStatus, TrendDirection};

use crate::stage::Stage;
use crate::state::WorkflowState;

/// Runs statistical trend analysis over the retrieved issue collection.
pub struct AnalysisAgent {
    analyzer: Arc<dyn TrendAnalyzer>,
}

impl AnalysisAgent {
    pub fn new(analyzer: Arc<dyn TrendAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl Stage for AnalysisAgent {
    fn id(&self) -> StageId {
        StageId::Analysis
    }

    fn execute(&self, mut state: WorkflowState) -> BoxFuture<'_, WorkflowState> {
        Box::pin(async move {
            state.set_stage_status(StageId::Analysis, StageStatus::Running);
            state.log_stage_progress(
                StageId::Analysis,
                20.0,
                format!("Analyzing {} issues", state.issues.len()),
            );

            if state.issues.is_empty() {
                state.set_stage_error(StageId::Analysis, "no issues available for analysis");
                state.set_stage_status(StageId::Analysis, StageStatus::Failed);
                return state;
            }

            match self
                .analyzer
                .analyze(&state.issues, state.inputs.window_days)
                .await
            {
                Ok(trend) => {
                    info!(
                        session_id = %state.session_id,
                        direction = trend.direction.as_str(),
                        confidence = trend.confidence,
                        anomalies = trend.anomalies.len(),
                        "Trend analysis complete"
                    );

                    state.add_insight(
                        StageId::Analysis,
                        "trend",
                        format!(
                            "Issue volume is {} over {} (slope {:+.3})",
                            trend.direction.as_str(),
                            trend.period,
                            trend.slope
                        ),
                        trend.confidence,
                    );
                    if !trend.anomalies.is_empty() {
                        state.add_insight(
                            StageId::Analysis,
                            "anomaly",
                            format!(
                                "{} days deviated beyond the 2-sigma band",
                                trend.anomalies.len()
                            ),
                            trend.confidence,
                        );
                    }
                    if trend.direction == TrendDirection::Increasing {
                        state.add_recommendation(
                            StageId::Analysis,
                            "Increase triage capacity before backlog growth compounds",
                            Priority::High,
                            "Issue creation rate is accelerating",
                        );
                    }

                    state.set_stage_output(
                        StageId::Analysis,
                        StageOutput::Analysis {
                            direction: trend.direction,
                            confidence: trend.confidence,
                            anomalies_detected: trend.anomalies.len(),
                        },
                    );
                    state.log_stage_progress(
                        StageId::Analysis,
                        100.0,
                        format!("Trend: {}", trend.direction.as_str()),
                    );
                    state.trend_summary = Some(trend);
                    state.set_stage_status(StageId::Analysis, StageStatus::Completed);
                }
                Err(err) => {
                    error!(
                        session_id = %state.session_id,
                        error = %err,
                        "Trend analysis failed"
                    );
                    state.set_stage_error(StageId::Analysis, err.to_string());
                    state.set_stage_status(StageId::Analysis, StageStatus::Failed);
                }
            }

            state
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use issuescope_core::error::Result;
    use issuescope_core::types::{Issue, IssueState, TrendSummary};

    use crate::state::WorkflowInputs;

    struct StubAnalyzer;

    impl TrendAnalyzer for StubAnalyzer {
        fn analyze<'a>(
            &'a self,
            issues: &'a [Issue],
            window_days: u32,
        ) -> BoxFuture<'a, Result<TrendSummary>> {
            let _ = issues;
            Box::pin(async move {
                let mut trend = TrendSummary::degraded(window_days);
                trend.direction = TrendDirection::Increasing;
                trend.confidence = 0.8;
                Ok(trend)
            })
        }
    }

    fn state_with_issues(count: usize) -> WorkflowState {
        let mut state = WorkflowState::new(WorkflowInputs {
            repository: "octo/repo".into(),
            window_days: 90,
            include_closed: true,
        });
        let now = Utc::now();
        state.issues = (0..count)
            .map(|i| Issue {
                id: i as u64,
                number: i as u64,
                title: format!("Issue {}", i),
                body: None,
                state: IssueState::Open,
                created_at: now - Duration::days(i as i64 % 30),
                updated_at: now,
                closed_at: None,
                labels: Vec::new(),
                assignees: Vec::new(),
                author: "dev".into(),
                comments_count: 0,
                reactions_count: 0,
            })
            .collect();
        state
    }

    #[tokio::test]
    async fn analysis_records_trend_and_insights() {
        let agent = AnalysisAgent::new(Arc::new(StubAnalyzer));
        let state = agent.execute(state_with_issues(60)).await;

        assert_eq!(state.stage_status(StageId::Analysis), StageStatus::Completed);
        assert!(state.trend_summary.is_some());
        assert!(state.insights.iter().any(|i| i.category == "trend"));
        // Increasing trend produces a capacity recommendation.
        assert!(!state.recommendations.is_empty());
    }

    #[tokio::test]
    async fn empty_collection_fails_fast() {
        let agent = AnalysisAgent::new(Arc::new(StubAnalyzer));
        let state = agent.execute(state_with_issues(0)).await;

        assert_eq!(state.stage_status(StageId::Analysis), StageStatus::Failed);
        assert!(state.trend_summary.is_none());
    }
}

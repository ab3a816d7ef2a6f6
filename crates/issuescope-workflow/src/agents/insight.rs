//! Insight generation agent.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::BoxFuture;
use tracing::{info, warn};

use issuescope_core::error::GenerationError;
use issuescope_core::traits::{InsightBundle, InsightContext, NarrativeSynthesizer};
use issuescope_core::types::{Priority, StageId, StageOutput, StageStatus, TrendSummary};

use crate::stage::Stage;
use crate::state::WorkflowState;

/// Derives structured insights from the issue collection via the narrative
/// synthesizer, with a deterministic fallback when synthesis misbehaves.
pub struct InsightAgent {
    synthesizer: Arc<dyn NarrativeSynthesizer>,
}

impl InsightAgent {
    pub fn new(synthesizer: Arc<dyn NarrativeSynthesizer>) -> Self {
        Self { synthesizer }
    }

    fn build_context(state: &mut WorkflowState) -> InsightContext {
        let now = Utc::now();
        let recent_cutoff = now - Duration::days(30);
        let stale_cutoff = now - Duration::days(90);

        let total_issues = state.issues.len();
        let open_issues = state.issues.iter().filter(|i| i.is_open()).count();
        let recent_issues_30d = state
            .issues
            .iter()
            .filter(|i| i.created_at >= recent_cutoff)
            .count();
        let unique_authors = state
            .issues
            .iter()
            .map(|i| i.author.as_str())
            .collect::<HashSet<_>>()
            .len();
        let avg_comments = if total_issues == 0 {
            0.0
        } else {
            state
                .issues
                .iter()
                .map(|i| i.comments_count as f64)
                .sum::<f64>()
                / total_issues as f64
        };
        let bug_issues = state.issues.iter().filter(|i| i.has_label("bug")).count();
        let security_issues = state
            .issues
            .iter()
            .filter(|i| i.has_label("security"))
            .count();
        let stale_open_issues = state
            .issues
            .iter()
            .filter(|i| i.is_open() && i.created_at < stale_cutoff)
            .count();

        // On the insufficient-data skip path analysis never ran; install a
        // low-confidence placeholder so downstream stages see a trend.
        let window_days = state.inputs.window_days;
        let trend = state
            .trend_summary
            .get_or_insert_with(|| TrendSummary::degraded(window_days))
            .clone();

        InsightContext {
            repository: state.inputs.repository.clone(),
            total_issues,
            open_issues,
            recent_issues_30d,
            unique_authors,
            avg_comments,
            bug_issues,
            security_issues,
            stale_open_issues,
            trend,
        }
    }

    fn record_bundle(state: &mut WorkflowState, bundle: &InsightBundle, fallback: bool) {
        let confidence = if fallback { 0.5 } else { 0.8 };

        state.add_insight(
            StageId::InsightGeneration,
            "health",
            bundle.health.summary.clone(),
            confidence,
        );
        state.add_insight(
            StageId::InsightGeneration,
            "maintenance",
            format!(
                "Maintenance load is {} with debt score {:.1}/10",
                bundle.maintenance.load_assessment.as_str(),
                bundle.maintenance.debt_score
            ),
            confidence,
        );
        state.add_insight(
            StageId::InsightGeneration,
            "community",
            format!(
                "Community engagement is {} across {} contributors",
                bundle.community.engagement_level.as_str(),
                bundle.community.unique_contributors
            ),
            confidence,
        );
        state.add_insight(
            StageId::InsightGeneration,
            "risks",
            format!("Overall risk level: {}", bundle.risks.overall_risk.as_str()),
            confidence,
        );

        for priority_text in bundle.strategic.priorities.iter().take(3) {
            state.add_recommendation(
                StageId::InsightGeneration,
                priority_text.clone(),
                Priority::Medium,
                "Strategic priority from insight synthesis",
            );
        }
    }
}

impl Stage for InsightAgent {
    fn id(&self) -> StageId {
        StageId::InsightGeneration
    }

    fn execute(&self, mut state: WorkflowState) -> BoxFuture<'_, WorkflowState> {
        Box::pin(async move {
            state.set_stage_status(StageId::InsightGeneration, StageStatus::Running);
            state.log_stage_progress(StageId::InsightGeneration, 30.0, "Generating insights");

            let ctx = Self::build_context(&mut state);

            let (bundle, fallback) = match self.synthesizer.insights(ctx.clone()).await {
                Ok(bundle) => (bundle, false),
                Err(GenerationError::Malformed(reason)) => {
                    // A malformed payload is recoverable locally; the
                    // deterministic bundle keeps the run on the happy path.
                    warn!(
                        session_id = %state.session_id,
                        reason,
                        "Insight synthesis returned malformed payload, using fallback bundle"
                    );
                    (InsightBundle::fallback(&ctx), true)
                }
                Err(GenerationError::Unavailable(reason)) => {
                    warn!(
                        session_id = %state.session_id,
                        reason,
                        "Insight synthesis unavailable"
                    );
                    state.set_stage_error(StageId::InsightGeneration, reason);
                    state.set_stage_status(StageId::InsightGeneration, StageStatus::Failed);
                    return state;
                }
            };

            Self::record_bundle(&mut state, &bundle, fallback);

            info!(
                session_id = %state.session_id,
                risk = bundle.risks.overall_risk.as_str(),
                fallback,
                "Insight generation complete"
            );

            state.set_stage_output(
                StageId::InsightGeneration,
                StageOutput::Insights {
                    categories: InsightBundle::CATEGORIES
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                    risk_level: bundle.risks.overall_risk.as_str().to_string(),
                    generated_by_fallback: fallback,
                },
            );
            state.log_stage_progress(
                StageId::InsightGeneration,
                100.0,
                format!("{} insight categories generated", InsightBundle::CATEGORIES.len()),
            );
            state.insight_bundle = Some(bundle);
            state.set_stage_status(StageId::InsightGeneration, StageStatus::Completed);
            state
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuescope_core::traits::{ReportContext, ReportNarrative};

    use crate::state::WorkflowInputs;

    struct OkSynth;

    impl NarrativeSynthesizer for OkSynth {
        fn insights(
            &self,
            ctx: InsightContext,
        ) -> BoxFuture<'_, Result<InsightBundle, GenerationError>> {
            Box::pin(async move { Ok(InsightBundle::fallback(&ctx)) })
        }

        fn report(
            &self,
            ctx: ReportContext,
        ) -> BoxFuture<'_, Result<ReportNarrative, GenerationError>> {
            Box::pin(async move { Ok(ReportNarrative::fallback(&ctx)) })
        }
    }

    struct FailingSynth(fn() -> GenerationError);

    impl NarrativeSynthesizer for FailingSynth {
        fn insights(
            &self,
            _ctx: InsightContext,
        ) -> BoxFuture<'_, Result<InsightBundle, GenerationError>> {
            let make = self.0;
            Box::pin(async move { Err(make()) })
        }

        fn report(
            &self,
            _ctx: ReportContext,
        ) -> BoxFuture<'_, Result<ReportNarrative, GenerationError>> {
            let make = self.0;
            Box::pin(async move { Err(make()) })
        }
    }

    fn state() -> WorkflowState {
        WorkflowState::new(WorkflowInputs {
            repository: "octo/repo".into(),
            window_days: 90,
            include_closed: true,
        })
    }

    #[tokio::test]
    async fn installs_degraded_trend_when_analysis_skipped() {
        let agent = InsightAgent::new(Arc::new(OkSynth));
        let result = agent.execute(state()).await;

        assert_eq!(
            result.stage_status(StageId::InsightGeneration),
            StageStatus::Completed
        );
        let trend = result
            .trend_summary
            .as_ref()
            .expect("placeholder trend installed");
        assert!(trend.confidence < 0.4);
        // Analysis itself was never visited.
        assert_eq!(result.stage_status(StageId::Analysis), StageStatus::Pending);
    }

    #[tokio::test]
    async fn appends_one_insight_per_category_group() {
        let agent = InsightAgent::new(Arc::new(OkSynth));
        let result = agent.execute(state()).await;

        let categories: Vec<&str> = result.insights.iter().map(|i| i.category.as_str()).collect();
        assert!(categories.contains(&"health"));
        assert!(categories.contains(&"maintenance"));
        assert!(categories.contains(&"community"));
        assert!(categories.contains(&"risks"));
        assert!(result.recommendations.len() <= 3);
    }

    #[tokio::test]
    async fn malformed_payload_falls_back_locally() {
        let agent = InsightAgent::new(Arc::new(FailingSynth(|| {
            GenerationError::Malformed("bad json".into())
        })));
        let result = agent.execute(state()).await;

        assert_eq!(
            result.stage_status(StageId::InsightGeneration),
            StageStatus::Completed
        );
        match result.stage_outputs.get(&StageId::InsightGeneration) {
            Some(StageOutput::Insights {
                generated_by_fallback,
                ..
            }) => assert!(generated_by_fallback),
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unavailable_synthesizer_fails_stage() {
        let agent = InsightAgent::new(Arc::new(FailingSynth(|| {
            GenerationError::Unavailable("generator offline".into())
        })));
        let result = agent.execute(state()).await;

        assert_eq!(
            result.stage_status(StageId::InsightGeneration),
            StageStatus::Failed
        );
        assert!(result.insights.is_empty());
    }
}

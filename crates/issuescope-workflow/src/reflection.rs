//! Reflection stage: workflow scoring and agent memory updates.

use chrono::Utc;
use futures::future::BoxFuture;
use tracing::info;

use issuescope_core::report::{QualitySubScores, WorkflowReflection};
use issuescope_core::types::{DataQuality, RunRecord, StageId, StageStatus};

use crate::stage::Stage;
use crate::state::WorkflowState;

fn saturating_ratio(count: usize, target: usize) -> f64 {
    (count as f64 / target as f64).min(1.0)
}

/// Scores the finished run and writes outcome records into each agent's
/// memory. Runs only after a successful report synthesis; fallback
/// completions end at the error handler.
pub struct ReflectionStage;

impl ReflectionStage {
    pub fn new() -> Self {
        Self
    }

    /// Weighted saturating composite in [0, 1]: agent completion dominates,
    /// data volume, insight count, and recommendation count each cap out at
    /// their targets (100 issues, 10 insights, 5 recommendations).
    fn workflow_score(state: &WorkflowState) -> (f64, QualitySubScores) {
        let agent_ratio = state.completed_agents().len() as f64 / StageId::AGENTS.len() as f64;
        let sub = QualitySubScores {
            data_coverage: saturating_ratio(state.issues.len(), 100),
            insight_quality: saturating_ratio(state.insights.len(), 10),
            recommendation_quality: saturating_ratio(state.recommendations.len(), 5),
        };
        let score = 0.4 * agent_ratio
            + 0.2 * sub.data_coverage
            + 0.2 * sub.insight_quality
            + 0.2 * sub.recommendation_quality;
        ((score * 1000.0).round() / 1000.0, sub)
    }

    fn improvement_suggestions(state: &WorkflowState, score: f64) -> Vec<String> {
        let mut suggestions = Vec::new();
        if score < 0.5 {
            suggestions.push("Overall workflow quality was low; review stage errors".to_string());
        }
        if state.issues.len() < 50 {
            suggestions.push(
                "Consider a longer analysis window for more robust statistics".to_string(),
            );
        }
        if matches!(
            state.data_quality,
            Some(DataQuality::Poor) | Some(DataQuality::Insufficient)
        ) {
            suggestions.push("Data quality was limited; trend confidence is reduced".to_string());
        }
        if state.insights.len() < 5 {
            suggestions.push("Few insights were generated; verify synthesizer output".to_string());
        }
        for agent in state.failed_agents() {
            suggestions.push(format!("Investigate the {} failure", agent.as_str()));
        }
        suggestions
    }

    fn update_memories(state: &mut WorkflowState, score: f64) {
        let repository = state.inputs.repository.clone();
        let data_quality = state.data_quality;

        for agent in StageId::AGENTS {
            let status = state.stage_status(agent);
            let memory = state.memory_mut(agent);
            match status {
                StageStatus::Completed => memory.bump_counter("successful_executions"),
                StageStatus::Failed => memory.bump_counter("failed_executions"),
                _ => continue,
            }
            memory.record_run(RunRecord {
                repository: repository.clone(),
                data_quality,
                status,
                workflow_score: score,
                timestamp: Utc::now(),
            });
        }
    }
}

impl Default for ReflectionStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ReflectionStage {
    fn id(&self) -> StageId {
        StageId::Reflection
    }

    fn execute(&self, mut state: WorkflowState) -> BoxFuture<'_, WorkflowState> {
        Box::pin(async move {
            state.set_stage_status(StageId::Reflection, StageStatus::Running);

            let (score, quality_metrics) = Self::workflow_score(&state);
            let suggestions = Self::improvement_suggestions(&state, score);

            let reflection = WorkflowReflection {
                workflow_score: score,
                successful_agents: state.completed_agents(),
                failed_agents: state.failed_agents(),
                routing_path: state.routing_trail.clone(),
                data_quality: state.data_quality,
                total_execution_secs: (Utc::now() - state.created_at).num_milliseconds() as f64
                    / 1000.0,
                quality_metrics,
                improvement_suggestions: suggestions,
            };

            info!(
                session_id = %state.session_id,
                workflow_score = score,
                successful = reflection.successful_agents.len(),
                failed = reflection.failed_agents.len(),
                "Workflow reflection complete"
            );

            Self::update_memories(&mut state, score);

            if let Some(report) = state.final_report.as_mut() {
                report.reflection = Some(reflection);
            }

            state.set_stage_status(StageId::Reflection, StageStatus::Completed);
            state
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::state::WorkflowInputs;

    fn state() -> WorkflowState {
        WorkflowState::new(WorkflowInputs {
            repository: "octo/repo".into(),
            window_days: 90,
            include_closed: true,
        })
    }

    fn completed_state() -> WorkflowState {
        let mut s = state();
        for agent in StageId::AGENTS {
            s.set_stage_status(agent, StageStatus::Completed);
        }
        s
    }

    #[test]
    fn perfect_run_scores_near_one() {
        let mut s = completed_state();
        s.issues = Vec::new();
        // Saturate the count-based terms.
        for _ in 0..10 {
            s.add_insight(StageId::Analysis, "trend", "x", 0.8);
        }
        for _ in 0..5 {
            s.add_recommendation(
                StageId::Analysis,
                "do it",
                issuescope_core::types::Priority::Low,
                "because",
            );
        }
        let (score, sub) = ReflectionStage::workflow_score(&s);
        assert_eq!(sub.insight_quality, 1.0);
        assert_eq!(sub.recommendation_quality, 1.0);
        // Data coverage is zero: 0.4 + 0.0 + 0.2 + 0.2.
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn failed_run_scores_low_with_suggestions() {
        let mut s = state();
        s.set_stage_status(StageId::DataRetrieval, StageStatus::Failed);

        let (score, _) = ReflectionStage::workflow_score(&s);
        assert!(score < 0.5);

        let suggestions = ReflectionStage::improvement_suggestions(&s, score);
        assert!(suggestions.iter().any(|m| m.contains("data_retrieval")));
        assert!(suggestions.iter().any(|m| m.contains("quality was low")));
    }

    #[tokio::test]
    async fn memories_record_run_outcomes() {
        let mut s = completed_state();
        s.set_stage_status(StageId::ReportGeneration, StageStatus::Failed);

        let s = ReflectionStage::new().execute(s).await;

        let retrieval = &s.agent_memories[&StageId::DataRetrieval];
        assert_eq!(retrieval.counters["successful_executions"], 1);
        assert_eq!(retrieval.history.len(), 1);

        let report = &s.agent_memories[&StageId::ReportGeneration];
        assert_eq!(report.counters["failed_executions"], 1);
        assert_eq!(report.history[0].status, StageStatus::Failed);
    }

    #[tokio::test]
    async fn reflection_attaches_to_existing_report() {
        let mut s = completed_state();
        s.final_report = Some(issuescope_core::report::FinalReport::minimal(
            "octo/repo", "sess", 90, "placeholder",
        ));

        let s = ReflectionStage::new().execute(s).await;
        let reflection = s
            .final_report
            .unwrap()
            .reflection
            .expect("reflection attached");
        assert_eq!(reflection.successful_agents.len(), 4);
    }

    #[tokio::test]
    async fn untouched_agents_get_no_memory() {
        let s = ReflectionStage::new().execute(state()).await;
        assert!(s.agent_memories[&StageId::Analysis].history.is_empty());
    }
}

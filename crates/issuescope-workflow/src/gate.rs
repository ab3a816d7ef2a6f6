//! Quality gate between retrieval and analysis.

use futures::future::BoxFuture;
use tracing::info;

use issuescope_core::types::{sentinel, DataQuality, StageId, StageStatus};

use crate::stage::Stage;
use crate::state::WorkflowState;

/// Inspects retrieval outcome and data quality, then appends exactly one
/// routing sentinel to the trail. The gate never mutates issues, quality, or
/// outputs — it only reads state and records its verdict.
pub struct QualityGate;

impl QualityGate {
    pub fn new() -> Self {
        Self
    }

    fn verdict(state: &WorkflowState) -> &'static str {
        if state.stage_status(StageId::DataRetrieval) != StageStatus::Completed {
            return sentinel::QUALITY_GATE_FAILED;
        }
        match state.data_quality {
            Some(DataQuality::Insufficient) => sentinel::INSUFFICIENT_DATA,
            Some(_) => sentinel::PROCEED_TO_ANALYSIS,
            // Retrieval completed without classifying quality; treat as a
            // failure so the run degrades instead of analyzing bad data.
            None => sentinel::QUALITY_UNKNOWN,
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for QualityGate {
    fn id(&self) -> StageId {
        StageId::QualityGate
    }

    fn execute(&self, mut state: WorkflowState) -> BoxFuture<'_, WorkflowState> {
        Box::pin(async move {
            state.set_stage_status(StageId::QualityGate, StageStatus::Running);

            let verdict = Self::verdict(&state);
            info!(
                session_id = %state.session_id,
                verdict,
                quality = ?state.data_quality,
                "Quality gate decision"
            );

            state.push_trail(verdict);
            state.set_stage_status(StageId::QualityGate, StageStatus::Completed);
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

    #[tokio::test]
    async fn failed_retrieval_gates_out() {
        let mut s = state();
        s.set_stage_status(StageId::DataRetrieval, StageStatus::Failed);

        let s = QualityGate::new().execute(s).await;
        assert_eq!(
            s.routing_trail.last().map(String::as_str),
            Some(sentinel::QUALITY_GATE_FAILED)
        );
    }

    #[tokio::test]
    async fn insufficient_data_routes_to_skip() {
        let mut s = state();
        s.set_stage_status(StageId::DataRetrieval, StageStatus::Completed);
        s.data_quality = Some(DataQuality::Insufficient);

        let s = QualityGate::new().execute(s).await;
        assert_eq!(
            s.routing_trail.last().map(String::as_str),
            Some(sentinel::INSUFFICIENT_DATA)
        );
    }

    #[tokio::test]
    async fn adequate_quality_proceeds() {
        for quality in [DataQuality::Poor, DataQuality::Good, DataQuality::Excellent] {
            let mut s = state();
            s.set_stage_status(StageId::DataRetrieval, StageStatus::Completed);
            s.data_quality = Some(quality);

            let s = QualityGate::new().execute(s).await;
            assert_eq!(
                s.routing_trail.last().map(String::as_str),
                Some(sentinel::PROCEED_TO_ANALYSIS)
            );
        }
    }

    #[tokio::test]
    async fn missing_quality_is_gated_out() {
        let mut s = state();
        s.set_stage_status(StageId::DataRetrieval, StageStatus::Completed);

        let s = QualityGate::new().execute(s).await;
        assert_eq!(
            s.routing_trail.last().map(String::as_str),
            Some(sentinel::QUALITY_UNKNOWN)
        );
    }
}

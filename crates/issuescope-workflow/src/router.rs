//! Conditional routing between stages.
//!
//! Pure functions over the state: the router reads statuses and the trail
//! and names the next stage, but never mutates anything. All failure paths
//! converge on the error handler, which ends the run; only fully successful
//! runs continue into reflection.

use issuescope_core::types::{sentinel, StageId, StageStatus};

use crate::state::WorkflowState;

/// The gate's verdict, read as the most recent sentinel on the trail.
fn last_sentinel(state: &WorkflowState) -> Option<&str> {
    state
        .routing_trail
        .iter()
        .rev()
        .map(String::as_str)
        .find(|entry| {
            matches!(
                *entry,
                sentinel::QUALITY_GATE_FAILED
                    | sentinel::INSUFFICIENT_DATA
                    | sentinel::PROCEED_TO_ANALYSIS
                    | sentinel::QUALITY_UNKNOWN
            )
        })
}

fn after_quality_gate(state: &WorkflowState) -> StageId {
    match last_sentinel(state) {
        Some(sentinel::PROCEED_TO_ANALYSIS) => StageId::Analysis,
        // Insufficient data skips statistical analysis but still produces
        // count-based insights and a report.
        Some(sentinel::INSUFFICIENT_DATA) => StageId::InsightGeneration,
        _ => StageId::ErrorHandler,
    }
}

fn failed_or(state: &WorkflowState, stage: StageId, next: StageId) -> StageId {
    if state.stage_status(stage) == StageStatus::Failed {
        StageId::ErrorHandler
    } else {
        next
    }
}

/// Names the stage to run after `stage`, or `None` when the run is done.
pub fn route_after(stage: StageId, state: &WorkflowState) -> Option<StageId> {
    match stage {
        StageId::DataRetrieval => Some(failed_or(
            state,
            StageId::DataRetrieval,
            StageId::QualityGate,
        )),
        StageId::QualityGate => Some(after_quality_gate(state)),
        StageId::Analysis => Some(failed_or(state, StageId::Analysis, StageId::InsightGeneration)),
        StageId::InsightGeneration => Some(failed_or(
            state,
            StageId::InsightGeneration,
            StageId::ReportGeneration,
        )),
        StageId::ReportGeneration => Some(failed_or(
            state,
            StageId::ReportGeneration,
            StageId::Reflection,
        )),
        // Fallback completion is terminal; reflection only follows a
        // successful report synthesis.
        StageId::ErrorHandler => None,
        StageId::Reflection => None,
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

    #[test]
    fn successful_retrieval_goes_to_gate() {
        let mut s = state();
        s.set_stage_status(StageId::DataRetrieval, StageStatus::Completed);
        assert_eq!(
            route_after(StageId::DataRetrieval, &s),
            Some(StageId::QualityGate)
        );
    }

    #[test]
    fn failed_retrieval_skips_the_gate() {
        let mut s = state();
        s.set_stage_status(StageId::DataRetrieval, StageStatus::Failed);
        assert_eq!(
            route_after(StageId::DataRetrieval, &s),
            Some(StageId::ErrorHandler)
        );
    }

    #[test]
    fn gate_verdicts_route_three_ways() {
        let mut s = state();
        s.push_trail(sentinel::PROCEED_TO_ANALYSIS);
        assert_eq!(route_after(StageId::QualityGate, &s), Some(StageId::Analysis));

        let mut s = state();
        s.push_trail(sentinel::INSUFFICIENT_DATA);
        assert_eq!(
            route_after(StageId::QualityGate, &s),
            Some(StageId::InsightGeneration)
        );

        let mut s = state();
        s.push_trail(sentinel::QUALITY_GATE_FAILED);
        assert_eq!(
            route_after(StageId::QualityGate, &s),
            Some(StageId::ErrorHandler)
        );
    }

    #[test]
    fn missing_sentinel_degrades_to_error_handler() {
        assert_eq!(
            route_after(StageId::QualityGate, &state()),
            Some(StageId::ErrorHandler)
        );
    }

    #[test]
    fn most_recent_sentinel_wins() {
        let mut s = state();
        s.push_trail(sentinel::PROCEED_TO_ANALYSIS);
        s.push_trail(StageId::Analysis.as_str());
        s.push_trail(sentinel::INSUFFICIENT_DATA);
        assert_eq!(
            route_after(StageId::QualityGate, &s),
            Some(StageId::InsightGeneration)
        );
    }

    #[test]
    fn agent_failures_converge_on_error_handler() {
        for stage in [
            StageId::Analysis,
            StageId::InsightGeneration,
            StageId::ReportGeneration,
        ] {
            let mut s = state();
            s.set_stage_status(stage, StageStatus::Failed);
            assert_eq!(route_after(stage, &s), Some(StageId::ErrorHandler));
        }
    }

    #[test]
    fn happy_path_reaches_reflection_and_terminates() {
        let mut s = state();
        s.set_stage_status(StageId::ReportGeneration, StageStatus::Completed);
        assert_eq!(
            route_after(StageId::ReportGeneration, &s),
            Some(StageId::Reflection)
        );
        assert_eq!(route_after(StageId::Reflection, &s), None);
    }

    #[test]
    fn error_handler_terminates_the_run() {
        assert_eq!(route_after(StageId::ErrorHandler, &state()), None);
    }
}

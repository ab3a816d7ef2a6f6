//! The stage abstraction every workflow node implements.

use futures::future::BoxFuture;

use issuescope_core::types::StageId;

use crate::state::WorkflowState;

/// One node of the workflow graph.
///
/// Stages take the state by value and always hand it back — a stage that
/// fails records a `Failed` status and an error message on the state rather
/// than returning an error. Escaped errors would strand the state; recorded
/// failures let the router steer the run toward fallback completion.
pub trait Stage: Send + Sync + 'static {
    fn id(&self) -> StageId;

    fn execute(&self, state: WorkflowState) -> BoxFuture<'_, WorkflowState>;
}

//! Data retrieval agent.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{error, info};

use issuescope_core::traits::{FetchRequest, IssueSource};
use issuescope_core::types::{DataQuality, StageId, StageOutput, StageStatus};

use crate::stage::Stage;
use crate::state::WorkflowState;

/// Fetches the issue collection and classifies its quality.
pub struct RetrievalAgent {
    source: Arc<dyn IssueSource>,
}

impl RetrievalAgent {
    pub fn new(source: Arc<dyn IssueSource>) -> Self {
        Self { source }
    }
}

impl Stage for RetrievalAgent {
    fn id(&self) -> StageId {
        StageId::DataRetrieval
    }

    fn execute(&self, mut state: WorkflowState) -> BoxFuture<'_, WorkflowState> {
        Box::pin(async move {
            state.set_stage_status(StageId::DataRetrieval, StageStatus::Running);
            state.log_stage_progress(
                StageId::DataRetrieval,
                10.0,
                format!("Fetching issues for {}", state.inputs.repository),
            );

            let request = FetchRequest {
                repository: state.inputs.repository.clone(),
                window_days: state.inputs.window_days,
                include_closed: state.inputs.include_closed,
            };

            match self.source.fetch(request).await {
                Ok(batch) => {
                    let quality = DataQuality::classify(batch.issues.len());
                    info!(
                        session_id = %state.session_id,
                        issues = batch.issues.len(),
                        quality = %quality,
                        "Issue retrieval complete"
                    );

                    state.set_stage_output(
                        StageId::DataRetrieval,
                        StageOutput::Retrieval {
                            issues_count: batch.issues.len(),
                            data_quality: quality,
                            repository: batch.repository.full_name.clone(),
                        },
                    );
                    state.log_stage_progress(
                        StageId::DataRetrieval,
                        100.0,
                        format!("Retrieved {} issues ({})", batch.issues.len(), quality),
                    );
                    state.issues = batch.issues;
                    state.repository = Some(batch.repository);
                    state.data_quality = Some(quality);
                    state.set_stage_status(StageId::DataRetrieval, StageStatus::Completed);
                }
                Err(err) => {
                    error!(
                        session_id = %state.session_id,
                        error = %err,
                        "Issue retrieval failed"
                    );
                    state.set_stage_error(StageId::DataRetrieval, err.to_string());
                    state.set_stage_status(StageId::DataRetrieval, StageStatus::Failed);
                }
            }

            state
        })
    }
}

//! The workflow driver.
//!
//! Runs stages in router order and yields a state snapshot after every
//! stage. The stream is pull-driven: dropping it between stages cancels the
//! rest of the run, and no stage executes past an unpolled boundary.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{error, info};

use issuescope_core::report::FinalReport;
use issuescope_core::traits::{IssueSource, NarrativeSynthesizer, TrendAnalyzer};
use issuescope_core::types::StageId;

use crate::agents::{AnalysisAgent, InsightAgent, ReportAgent, RetrievalAgent};
use crate::fallback::ErrorHandler;
use crate::gate::QualityGate;
use crate::reflection::ReflectionStage;
use crate::router::route_after;
use crate::stage::Stage;
use crate::state::{WorkflowInputs, WorkflowState};

/// One implementation per stage slot.
pub struct StageSet {
    pub retrieval: Arc<dyn Stage>,
    pub quality_gate: Arc<dyn Stage>,
    pub analysis: Arc<dyn Stage>,
    pub insight: Arc<dyn Stage>,
    pub report: Arc<dyn Stage>,
    pub error_handler: Arc<dyn Stage>,
    pub reflection: Arc<dyn Stage>,
}

impl StageSet {
    /// The standard wiring: four collaborator-backed agents plus the
    /// orchestrator-owned gate, error handler, and reflection stages.
    pub fn standard(
        source: Arc<dyn IssueSource>,
        analyzer: Arc<dyn TrendAnalyzer>,
        synthesizer: Arc<dyn NarrativeSynthesizer>,
    ) -> Self {
        Self {
            retrieval: Arc::new(RetrievalAgent::new(source)),
            quality_gate: Arc::new(QualityGate::new()),
            analysis: Arc::new(AnalysisAgent::new(analyzer)),
            insight: Arc::new(InsightAgent::new(Arc::clone(&synthesizer))),
            report: Arc::new(ReportAgent::new(synthesizer)),
            error_handler: Arc::new(ErrorHandler::new()),
            reflection: Arc::new(ReflectionStage::new()),
        }
    }

    fn stage(&self, id: StageId) -> Arc<dyn Stage> {
        match id {
            StageId::DataRetrieval => Arc::clone(&self.retrieval),
            StageId::QualityGate => Arc::clone(&self.quality_gate),
            StageId::Analysis => Arc::clone(&self.analysis),
            StageId::InsightGeneration => Arc::clone(&self.insight),
            StageId::ReportGeneration => Arc::clone(&self.report),
            StageId::ErrorHandler => Arc::clone(&self.error_handler),
            StageId::Reflection => Arc::clone(&self.reflection),
        }
    }
}

/// Workflow-level completion marker pushed before each stage runs.
fn stage_marker(stage: StageId) -> (f64, &'static str) {
    match stage {
        StageId::DataRetrieval => (5.0, "Retrieving issue data"),
        StageId::QualityGate => (15.0, "Evaluating data quality"),
        StageId::Analysis => (25.0, "Analyzing issue trends"),
        StageId::InsightGeneration => (60.0, "Generating insights"),
        StageId::ReportGeneration => (85.0, "Generating final report"),
        StageId::ErrorHandler => (90.0, "Recovering from failures"),
        StageId::Reflection => (95.0, "Reflecting on workflow execution"),
    }
}

struct Driver {
    state: WorkflowState,
    next: Option<StageId>,
    visited: HashSet<StageId>,
}

/// Drives workflow runs and hands out snapshot streams.
pub struct Orchestrator {
    stages: Arc<StageSet>,
}

impl Orchestrator {
    pub fn new(stages: StageSet) -> Self {
        Self {
            stages: Arc::new(stages),
        }
    }

    pub fn run(&self, inputs: WorkflowInputs) -> BoxStream<'static, WorkflowState> {
        self.run_state(WorkflowState::new(inputs))
    }

    /// Runs from a pre-built state, so callers can learn the session id
    /// before the first stage executes.
    pub fn run_state(&self, state: WorkflowState) -> BoxStream<'static, WorkflowState> {
        info!(
            session_id = %state.session_id,
            repository = %state.inputs.repository,
            window_days = state.inputs.window_days,
            "Starting workflow"
        );

        let stages = Arc::clone(&self.stages);
        let driver = Driver {
            state,
            next: Some(StageId::DataRetrieval),
            visited: HashSet::new(),
        };

        futures::stream::unfold(driver, move |mut driver| {
            let stages = Arc::clone(&stages);
            async move {
                let stage_id = driver.next?;
                let mut state = driver.state;

                // A stage scheduled twice means the routing layer broke its
                // acyclicity contract; abort with a minimal failure report
                // instead of looping.
                if !driver.visited.insert(stage_id) {
                    let message = format!("stage {} scheduled twice", stage_id.as_str());
                    error!(session_id = %state.session_id, %message, "Orchestrator failure");

                    state.orchestrator_error = Some(message.clone());
                    state.final_report = Some(FinalReport::minimal(
                        state.inputs.repository.clone(),
                        state.session_id.to_string(),
                        state.inputs.window_days,
                        message,
                    ));
                    state.update_progress("workflow_failed", 100.0, "Workflow aborted");

                    driver.state = state.clone();
                    driver.next = None;
                    return Some((state, driver));
                }

                let (percentage, message) = stage_marker(stage_id);
                state.push_trail(stage_id.as_str());
                state.update_progress("workflow", percentage, message);

                state = stages.stage(stage_id).execute(state).await;

                driver.next = route_after(stage_id, &state);
                if driver.next.is_none() {
                    let step = if driver.visited.contains(&StageId::ErrorHandler) {
                        "error_recovery"
                    } else {
                        "completed"
                    };
                    state.update_progress(step, 100.0, "Workflow finished");
                    info!(
                        session_id = %state.session_id,
                        step,
                        "Workflow finished"
                    );
                }

                driver.state = state.clone();
                Some((state, driver))
            }
        })
        .boxed()
    }
}

//! The shared workflow state threaded through every stage.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use issuescope_core::report::FinalReport;
use issuescope_core::traits::InsightBundle;
use issuescope_core::types::{
    AgentMemory, DataQuality, Insight, Issue, Priority, ProgressEvent, Recommendation,
    RepoMetadata, SessionId, StageId, StageOutput, StageStatus, TrendSummary,
};

/// Immutable run parameters captured at session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInputs {
    pub repository: String,
    pub window_days: u32,
    pub include_closed: bool,
}

/// Everything a workflow run knows, owned and passed by value between
/// stages. Each stage receives the state, mutates its own slots, and hands
/// it back; snapshots of this struct are what sessions stream to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    /// Monotonic: mutators only ever move this forward.
    pub updated_at: DateTime<Utc>,
    pub inputs: WorkflowInputs,

    #[serde(default)]
    pub stage_statuses: HashMap<StageId, StageStatus>,
    #[serde(default)]
    pub stage_outputs: HashMap<StageId, StageOutput>,
    #[serde(default)]
    pub stage_errors: HashMap<StageId, String>,

    #[serde(default)]
    pub issues: Vec<Issue>,
    pub repository: Option<RepoMetadata>,
    pub trend_summary: Option<TrendSummary>,
    pub data_quality: Option<DataQuality>,

    /// Stage names and routing sentinels, in visit order.
    #[serde(default)]
    pub routing_trail: Vec<String>,

    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    /// Structured payload retained for report synthesis; the flattened
    /// `insights` list is what clients see.
    pub insight_bundle: Option<InsightBundle>,
    pub final_report: Option<FinalReport>,

    #[serde(default)]
    pub progress_log: Vec<ProgressEvent>,
    pub current_step: String,
    pub completion_percentage: f64,

    #[serde(default)]
    pub agent_memories: HashMap<StageId, AgentMemory>,
    /// Set only when the driver itself fails, distinct from any stage error.
    pub orchestrator_error: Option<String>,
}

impl WorkflowState {
    pub fn new(inputs: WorkflowInputs) -> Self {
        Self::with_session_id(SessionId::new(), inputs)
    }

    /// Like [`new`](Self::new), but under an externally assigned session id
    /// so callers can correlate the run with an identifier they handed out
    /// before the first stage executes.
    pub fn with_session_id(session_id: SessionId, inputs: WorkflowInputs) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            created_at: now,
            updated_at: now,
            inputs,
            stage_statuses: HashMap::new(),
            stage_outputs: HashMap::new(),
            stage_errors: HashMap::new(),
            issues: Vec::new(),
            repository: None,
            trend_summary: None,
            data_quality: None,
            routing_trail: Vec::new(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            insight_bundle: None,
            final_report: None,
            progress_log: Vec::new(),
            current_step: "initialized".to_string(),
            completion_percentage: 0.0,
            agent_memories: HashMap::new(),
            orchestrator_error: None,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn stage_status(&self, stage: StageId) -> StageStatus {
        self.stage_statuses
            .get(&stage)
            .copied()
            .unwrap_or(StageStatus::Pending)
    }

    pub fn set_stage_status(&mut self, stage: StageId, status: StageStatus) {
        self.stage_statuses.insert(stage, status);
        self.touch();
    }

    pub fn set_stage_output(&mut self, stage: StageId, output: StageOutput) {
        self.stage_outputs.insert(stage, output);
        self.touch();
    }

    pub fn set_stage_error(&mut self, stage: StageId, error: impl Into<String>) {
        self.stage_errors.insert(stage, error.into());
        self.touch();
    }

    pub fn add_insight(
        &mut self,
        agent: StageId,
        category: impl Into<String>,
        content: impl Into<String>,
        confidence: f64,
    ) {
        self.insights.push(Insight {
            agent,
            category: category.into(),
            content: content.into(),
            confidence,
            timestamp: Utc::now(),
        });
        self.touch();
    }

    pub fn add_recommendation(
        &mut self,
        agent: StageId,
        text: impl Into<String>,
        priority: Priority,
        rationale: impl Into<String>,
    ) {
        self.recommendations.push(Recommendation {
            agent,
            text: text.into(),
            priority,
            rationale: rationale.into(),
            timestamp: Utc::now(),
        });
        self.touch();
    }

    /// Run-level progress: the orchestrator (and terminal stages) own
    /// `completion_percentage`, and 100 means the run is over.
    pub fn update_progress(
        &mut self,
        step: impl Into<String>,
        percentage: f64,
        message: impl Into<String>,
    ) {
        let event = ProgressEvent::new(step, percentage, message);
        self.current_step = event.step.clone();
        self.completion_percentage = event.percentage;
        self.progress_log.push(event);
        self.touch();
    }

    /// Stage-local progress: logged and reflected in `current_step`, but a
    /// stage finishing at its own 100% must not read as the whole run
    /// finishing.
    pub fn log_stage_progress(
        &mut self,
        stage: StageId,
        percentage: f64,
        message: impl Into<String>,
    ) {
        let event = ProgressEvent::new(stage.as_str(), percentage, message);
        self.current_step = event.step.clone();
        self.progress_log.push(event);
        self.touch();
    }

    pub fn push_trail(&mut self, entry: impl Into<String>) {
        self.routing_trail.push(entry.into());
        self.touch();
    }

    /// Trail entries that name actual stages, with sentinels filtered out.
    pub fn stages_visited(&self) -> Vec<&str> {
        let stage_names: Vec<&str> = [
            StageId::DataRetrieval,
            StageId::QualityGate,
            StageId::Analysis,
            StageId::InsightGeneration,
            StageId::ReportGeneration,
            StageId::ErrorHandler,
            StageId::Reflection,
        ]
        .iter()
        .map(|s| s.as_str())
        .collect();

        self.routing_trail
            .iter()
            .map(|s| s.as_str())
            .filter(|s| stage_names.contains(s))
            .collect()
    }

    pub fn memory_mut(&mut self, agent: StageId) -> &mut AgentMemory {
        self.touch();
        self.agent_memories.entry(agent).or_default()
    }

    pub fn failed_agents(&self) -> Vec<StageId> {
        StageId::AGENTS
            .iter()
            .copied()
            .filter(|a| self.stage_status(*a) == StageStatus::Failed)
            .collect()
    }

    pub fn completed_agents(&self) -> Vec<StageId> {
        StageId::AGENTS
            .iter()
            .copied()
            .filter(|a| self.stage_status(*a) == StageStatus::Completed)
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.completion_percentage >= 100.0
    }
}

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique workflow session identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed, finite set of workflow stages.
///
/// Status/output/error maps on the workflow state are keyed by this enum, so
/// no stage can ever introduce an unknown key.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    DataRetrieval,
    QualityGate,
    Analysis,
    InsightGeneration,
    ReportGeneration,
    ErrorHandler,
    Reflection,
}

impl StageId {
    /// The four interchangeable stage agents (the gate, error handler, and
    /// reflection stages are orchestrator-owned and carry no agent memory).
    pub const AGENTS: [StageId; 4] = [
        StageId::DataRetrieval,
        StageId::Analysis,
        StageId::InsightGeneration,
        StageId::ReportGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::DataRetrieval => "data_retrieval",
            StageId::QualityGate => "quality_gate",
            StageId::Analysis => "analysis",
            StageId::InsightGeneration => "insight_generation",
            StageId::ReportGeneration => "report_generation",
            StageId::ErrorHandler => "error_handler",
            StageId::Reflection => "reflection",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an individual stage during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Coarse classification of whether enough issue data exists for full
/// statistical analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Excellent,
    Good,
    Poor,
    Insufficient,
}

impl DataQuality {
    /// Volume-based classification. An empty collection is `Insufficient`,
    /// not an error — the quality gate downgrades the run instead of
    /// failing it.
    pub fn classify(issue_count: usize) -> Self {
        match issue_count {
            n if n >= 200 => DataQuality::Excellent,
            n if n >= 50 => DataQuality::Good,
            n if n >= 20 => DataQuality::Poor,
            _ => DataQuality::Insufficient,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Excellent => "excellent",
            DataQuality::Good => "good",
            DataQuality::Poor => "poor",
            DataQuality::Insufficient => "insufficient",
        }
    }
}

impl std::fmt::Display for DataQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing sentinels appended to the trail by the quality gate.
pub mod sentinel {
    pub const QUALITY_GATE_FAILED: &str = "quality_gate_failed";
    pub const INSUFFICIENT_DATA: &str = "insufficient_data";
    pub const PROCEED_TO_ANALYSIS: &str = "proceed_to_analysis";
    pub const QUALITY_UNKNOWN: &str = "quality_unknown";
}

/// Open/closed lifecycle state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// A single repository issue record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    pub author: String,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default)]
    pub reactions_count: u32,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }

    pub fn has_label(&self, needle: &str) -> bool {
        self.labels
            .iter()
            .any(|l| l.to_lowercase().contains(needle))
    }
}

/// Repository metadata returned alongside an issue batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Direction of the issue-volume trend over the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

/// Recurring activity patterns detected in the window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonalPatterns {
    /// Issue counts by weekday name, Monday first.
    #[serde(default)]
    pub weekday: BTreeMap<String, u32>,
}

impl SeasonalPatterns {
    pub fn is_empty(&self) -> bool {
        self.weekday.is_empty()
    }
}

/// A day whose issue volume deviated significantly from the window baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    /// Date in `YYYY-MM-DD` form.
    pub date: String,
    pub kind: String,
    pub observed: u32,
    pub expected: u32,
    pub severity: String,
}

/// A single forecasted day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub value: f64,
}

/// Short-horizon issue-volume forecast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub method: String,
    #[serde(default)]
    pub points: Vec<ForecastPoint>,
    pub historical_daily_average: f64,
}

/// Results from the trend analysis collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    pub slope: f64,
    pub seasonal: SeasonalPatterns,
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    pub forecast: Forecast,
    pub confidence: f64,
    pub period: String,
}

impl TrendSummary {
    /// Placeholder summary installed when analysis is skipped on the
    /// insufficient-data path. Carries a low confidence so degraded runs
    /// stay distinguishable from analyzed ones.
    pub fn degraded(window_days: u32) -> Self {
        Self {
            direction: TrendDirection::Stable,
            slope: 0.0,
            seasonal: SeasonalPatterns::default(),
            anomalies: Vec::new(),
            forecast: Forecast {
                method: "none".into(),
                points: Vec::new(),
                historical_daily_average: 0.0,
            },
            confidence: 0.2,
            period: format!("{} days (insufficient data)", window_days),
        }
    }
}

/// Priority tag on a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// An insight discovered by a stage agent. Append-only within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub agent: StageId,
    pub category: String,
    pub content: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// A recommendation produced by a stage agent. Append-only within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub agent: StageId,
    pub text: String,
    pub priority: Priority,
    pub rationale: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry of the streaming progress log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub timestamp: DateTime<Utc>,
    pub step: String,
    /// Percentage complete, clamped to [0, 100] on construction.
    pub percentage: f64,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(step: impl Into<String>, percentage: f64, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            step: step.into(),
            percentage: percentage.clamp(0.0, 100.0),
            message: message.into(),
        }
    }
}

/// One run's outcome recorded into an agent's memory by reflection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub repository: String,
    pub data_quality: Option<DataQuality>,
    pub status: StageStatus,
    pub workflow_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Learned statistics carried by each stage agent across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMemory {
    /// Free-form learned key/value patterns.
    #[serde(default)]
    pub patterns: HashMap<String, String>,
    /// Numeric performance counters (successful_executions, failed_executions).
    #[serde(default)]
    pub counters: HashMap<String, u64>,
    /// Per-run history, capped at [`AgentMemory::HISTORY_CAP`], drop-oldest.
    #[serde(default)]
    pub history: Vec<RunRecord>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl AgentMemory {
    pub const HISTORY_CAP: usize = 50;

    pub fn bump_counter(&mut self, key: &str) {
        *self.counters.entry(key.to_string()).or_insert(0) += 1;
        self.updated_at = Utc::now();
    }

    pub fn record_run(&mut self, record: RunRecord) {
        self.history.push(record);
        if self.history.len() > Self::HISTORY_CAP {
            let excess = self.history.len() - Self::HISTORY_CAP;
            self.history.drain(..excess);
        }
        self.updated_at = Utc::now();
    }
}

/// Structured per-stage output, one variant per payload kind.
///
/// Each stage agent writes only into its own slot of the processed-data map;
/// the variants keep those slots schema'd instead of open-ended JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutput {
    Retrieval {
        issues_count: usize,
        data_quality: DataQuality,
        repository: String,
    },
    Analysis {
        direction: TrendDirection,
        confidence: f64,
        anomalies_detected: usize,
    },
    Insights {
        categories: Vec<String>,
        risk_level: String,
        generated_by_fallback: bool,
    },
    Report {
        sections: Vec<String>,
        confidence: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_thresholds() {
        assert_eq!(DataQuality::classify(0), DataQuality::Insufficient);
        assert_eq!(DataQuality::classify(5), DataQuality::Insufficient);
        assert_eq!(DataQuality::classify(20), DataQuality::Poor);
        assert_eq!(DataQuality::classify(50), DataQuality::Good);
        assert_eq!(DataQuality::classify(120), DataQuality::Good);
        assert_eq!(DataQuality::classify(200), DataQuality::Excellent);
    }

    #[test]
    fn progress_event_clamps() {
        assert_eq!(ProgressEvent::new("x", 150.0, "").percentage, 100.0);
        assert_eq!(ProgressEvent::new("x", -3.0, "").percentage, 0.0);
        assert_eq!(ProgressEvent::new("x", 42.5, "").percentage, 42.5);
    }

    #[test]
    fn memory_history_drops_oldest() {
        let mut memory = AgentMemory::default();
        for i in 0..60 {
            memory.record_run(RunRecord {
                repository: format!("repo-{}", i),
                data_quality: Some(DataQuality::Good),
                status: StageStatus::Completed,
                workflow_score: 0.9,
                timestamp: Utc::now(),
            });
        }
        assert_eq!(memory.history.len(), AgentMemory::HISTORY_CAP);
        assert_eq!(memory.history[0].repository, "repo-10");
        assert_eq!(memory.history.last().unwrap().repository, "repo-59");
    }

    #[test]
    fn stage_id_round_trip() {
        for id in [
            StageId::DataRetrieval,
            StageId::QualityGate,
            StageId::Analysis,
            StageId::InsightGeneration,
            StageId::ReportGeneration,
            StageId::ErrorHandler,
            StageId::Reflection,
        ] {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    #[test]
    fn degraded_trend_is_low_confidence() {
        let trend = TrendSummary::degraded(90);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert!(trend.confidence < 0.4);
        assert!(trend.period.contains("90"));
    }
}

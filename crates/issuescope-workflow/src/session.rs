//! In-memory session registry.
//!
//! Holds the latest snapshot of every run and fans snapshots out to
//! subscribers over a broadcast channel per session.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use issuescope_core::error::{IssueScopeError, Result};
use issuescope_core::report::FinalReport;

use crate::state::WorkflowState;

const CHANNEL_CAPACITY: usize = 64;

struct SessionEntry {
    latest: WorkflowState,
    tx: broadcast::Sender<WorkflowState>,
}

/// Condensed per-session row for listings.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub repository: String,
    pub current_step: String,
    pub completion_percentage: f64,
    pub updated_at: DateTime<Utc>,
}

/// Thread-safe registry of active and finished workflow sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session from its initial state. Idempotent per id.
    pub fn register(&self, state: &WorkflowState) {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        sessions
            .entry(state.session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id = %state.session_id, "Session registered");
                let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
                SessionEntry {
                    latest: state.clone(),
                    tx,
                }
            });
    }

    /// Stores the snapshot as latest and fans it out to subscribers.
    pub fn publish(&self, state: &WorkflowState) {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        let entry = sessions
            .entry(state.session_id.to_string())
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
                SessionEntry {
                    latest: state.clone(),
                    tx,
                }
            });
        entry.latest = state.clone();
        // Send errors just mean nobody is listening right now.
        let _ = entry.tx.send(state.clone());
    }

    pub fn latest(&self, session_id: &str) -> Result<WorkflowState> {
        let sessions = self.sessions.read().expect("session lock poisoned");
        sessions
            .get(session_id)
            .map(|entry| entry.latest.clone())
            .ok_or_else(|| IssueScopeError::SessionNotFound(session_id.to_string()))
    }

    pub fn subscribe(&self, session_id: &str) -> Result<broadcast::Receiver<WorkflowState>> {
        let sessions = self.sessions.read().expect("session lock poisoned");
        sessions
            .get(session_id)
            .map(|entry| entry.tx.subscribe())
            .ok_or_else(|| IssueScopeError::SessionNotFound(session_id.to_string()))
    }

    /// The final report, available only once the run has finished.
    pub fn final_result(&self, session_id: &str) -> Result<Option<FinalReport>> {
        let state = self.latest(session_id)?;
        if state.is_finished() {
            Ok(state.final_report)
        } else {
            Ok(None)
        }
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().expect("session lock poisoned");
        let mut rows: Vec<SessionSummary> = sessions
            .values()
            .map(|entry| SessionSummary {
                session_id: entry.latest.session_id.to_string(),
                repository: entry.latest.inputs.repository.clone(),
                current_step: entry.latest.current_step.clone(),
                completion_percentage: entry.latest.completion_percentage,
                updated_at: entry.latest.updated_at,
            })
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        rows
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
    fn unknown_session_is_an_error() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.latest("nope"),
            Err(IssueScopeError::SessionNotFound(_))
        ));
    }

    #[test]
    fn publish_updates_latest() {
        let registry = SessionRegistry::new();
        let mut s = state();
        registry.register(&s);

        s.update_progress("workflow", 25.0, "Analyzing");
        registry.publish(&s);

        let latest = registry.latest(&s.session_id.to_string()).unwrap();
        assert_eq!(latest.completion_percentage, 25.0);
    }

    #[test]
    fn final_result_gated_on_completion() {
        let registry = SessionRegistry::new();
        let mut s = state();
        registry.register(&s);

        s.final_report = Some(FinalReport::minimal("octo/repo", "sess", 90, "early"));
        registry.publish(&s);
        assert!(registry
            .final_result(&s.session_id.to_string())
            .unwrap()
            .is_none());

        s.update_progress("completed", 100.0, "done");
        registry.publish(&s);
        assert!(registry
            .final_result(&s.session_id.to_string())
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn subscribers_receive_snapshots() {
        let registry = SessionRegistry::new();
        let mut s = state();
        registry.register(&s);

        let mut rx = registry.subscribe(&s.session_id.to_string()).unwrap();
        s.update_progress("workflow", 60.0, "Generating insights");
        registry.publish(&s);

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.completion_percentage, 60.0);
    }

    #[test]
    fn listing_shows_most_recent_first() {
        let registry = SessionRegistry::new();
        let a = state();
        registry.register(&a);

        let mut b = state();
        registry.register(&b);
        b.update_progress("workflow", 10.0, "later activity");
        registry.publish(&b);

        let rows = registry.list();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].session_id, b.session_id.to_string());
    }
}

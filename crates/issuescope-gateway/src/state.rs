use std::sync::Arc;

use issuescope_core::config::{AnalysisConfig, GatewayConfig};
use issuescope_workflow::{Orchestrator, SessionRegistry};

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub analysis_defaults: AnalysisConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<SessionRegistry>,
}

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use issuescope_core::config::{AnalysisConfig, GatewayConfig};
use issuescope_workflow::{Orchestrator, SessionRegistry};

use crate::routes;
use crate::state::AppState;

/// HTTP + WebSocket gateway server built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    analysis_defaults: AnalysisConfig,
    orchestrator: Arc<Orchestrator>,
    registry: Arc<SessionRegistry>,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        analysis_defaults: AnalysisConfig,
        orchestrator: Arc<Orchestrator>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            config,
            analysis_defaults,
            orchestrator,
            registry,
        }
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            analysis_defaults: self.analysis_defaults.clone(),
            orchestrator: self.orchestrator.clone(),
            registry: self.registry.clone(),
        });

        let app = Router::new()
            // WebSocket
            .route("/ws/{id}", get(routes::ws_handler))
            // REST API
            .route("/api/health", get(routes::health))
            .route("/api/analyze", post(routes::start_analysis))
            .route("/api/sessions", get(routes::list_sessions))
            .route("/api/sessions/{id}/status", get(routes::session_status))
            .route("/api/sessions/{id}/results", get(routes::session_results))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}

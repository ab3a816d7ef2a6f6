use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use issuescope_core::types::SessionId;
use issuescope_workflow::{WorkflowInputs, WorkflowState};

use crate::state::AppState;

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
pub struct AnalyzeBody {
    pub repository: String,
    #[serde(default)]
    pub window_days: Option<u32>,
    #[serde(default)]
    pub include_closed: Option<bool>,
    /// Client-assigned session id; one is generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

// POST /api/analyze — start a workflow run, return its session id
pub async fn start_analysis(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if body.repository.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let inputs = WorkflowInputs {
        repository: body.repository,
        window_days: body
            .window_days
            .unwrap_or(state.analysis_defaults.window_days),
        include_closed: body
            .include_closed
            .unwrap_or(state.analysis_defaults.include_closed),
    };

    let initial = match body.session_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            WorkflowState::with_session_id(SessionId::from_string(id), inputs)
        }
        _ => WorkflowState::new(inputs),
    };
    let session_id = initial.session_id.to_string();
    state.registry.register(&initial);

    info!(session_id, repository = %initial.inputs.repository, "Analysis requested");

    let registry = Arc::clone(&state.registry);
    let mut stream = state.orchestrator.run_state(initial);
    tokio::spawn(async move {
        while let Some(snapshot) = stream.next().await {
            registry.publish(&snapshot);
        }
    });

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "status": "started",
    })))
}

// GET /api/sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "sessions": state.registry.list() }))
}

// GET /api/sessions/:id/status
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let snapshot = state
        .registry
        .latest(&id)
        .map_err(|_| StatusCode::NOT_FOUND)?;

    Ok(Json(serde_json::json!({
        "session_id": snapshot.session_id.to_string(),
        "repository": snapshot.inputs.repository,
        "current_step": snapshot.current_step,
        "completion_percentage": snapshot.completion_percentage,
        "data_quality": snapshot.data_quality,
        "routing_trail": snapshot.routing_trail,
        "stage_statuses": snapshot.stage_statuses,
        "updated_at": snapshot.updated_at,
    })))
}

// GET /api/sessions/:id/results — 404 unknown, 202 still running
pub async fn session_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let report = state
        .registry
        .final_result(&id)
        .map_err(|_| StatusCode::NOT_FOUND)?;

    match report {
        Some(report) => Ok(Json(serde_json::json!({ "report": report }))),
        None => Err(StatusCode::ACCEPTED),
    }
}

// GET /ws/:id — stream state snapshots for one session
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, id))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, session_id: String) {
    let Ok(latest) = state.registry.latest(&session_id) else {
        let _ = socket
            .send(Message::Text(
                serde_json::json!({
                    "type": "error",
                    "message": format!("unknown session: {}", session_id),
                })
                .to_string()
                .into(),
            ))
            .await;
        return;
    };

    debug!(session_id, "WebSocket subscriber connected");

    // Catch the client up before streaming live snapshots.
    if send_state(&mut socket, &latest).await.is_err() {
        return;
    }
    if latest.is_finished() {
        return;
    }

    let Ok(mut rx) = state.registry.subscribe(&session_id) else {
        return;
    };

    loop {
        match rx.recv().await {
            Ok(snapshot) => {
                let finished = snapshot.is_finished();
                if send_state(&mut socket, &snapshot).await.is_err() {
                    break;
                }
                if finished {
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(session_id, skipped, "WebSocket subscriber lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    debug!(session_id, "WebSocket subscriber disconnected");
}

async fn send_state(
    socket: &mut WebSocket,
    snapshot: &WorkflowState,
) -> Result<(), axum::Error> {
    let frame = serde_json::json!({
        "type": "state_update",
        "state": snapshot,
    });
    socket.send(Message::Text(frame.to_string().into())).await
}

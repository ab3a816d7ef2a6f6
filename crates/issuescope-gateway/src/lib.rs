//! HTTP and WebSocket access to workflow sessions.
//!
//! `POST /api/analyze` starts a run; `/api/sessions/*` report progress and
//! results; `/ws/{id}` streams state snapshots as they are produced.

pub mod routes;
pub mod server;
pub mod state;

pub use server::GatewayServer;

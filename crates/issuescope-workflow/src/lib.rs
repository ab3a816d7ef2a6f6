//! Workflow orchestration engine.
//!
//! A run threads one [`state::WorkflowState`] through a fixed graph of
//! stages: retrieval, quality gate, trend analysis, insight generation,
//! report generation, with an error handler catching every failure path and
//! a reflection stage closing out all of them. The [`orchestrator`] drives
//! the graph and yields a snapshot after each stage; [`session`] keeps
//! snapshots addressable by session id.

pub mod agents;
pub mod fallback;
pub mod gate;
pub mod orchestrator;
pub mod reflection;
pub mod router;
pub mod session;
pub mod stage;
pub mod state;

pub use orchestrator::{Orchestrator, StageSet};
pub use session::SessionRegistry;
pub use stage::Stage;
pub use state::{WorkflowInputs, WorkflowState};

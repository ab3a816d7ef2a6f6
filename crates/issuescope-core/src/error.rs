use thiserror::Error;

#[derive(Debug, Error)]
pub enum IssueScopeError {
    // Issue source errors
    #[error("Issue source request failed: {0}")]
    Source(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Issue source rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    // Analysis errors
    #[error("Trend analysis failed: {0}")]
    Analysis(String),

    // Workflow errors
    #[error("Orchestrator failure: {0}")]
    Orchestrator(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IssueScopeError>;

/// Failure modes of a narrative-producing collaborator.
///
/// The workflow never surfaces these past a stage boundary: every call site
/// pairs `insights()`/`report()` with the payload type's deterministic
/// `fallback` constructor.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Narrative generation unavailable: {0}")]
    Unavailable(String),

    #[error("Narrative payload malformed: {0}")]
    Malformed(String),
}

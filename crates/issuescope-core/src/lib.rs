pub mod config;
pub mod error;
pub mod report;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{GenerationError, IssueScopeError, Result};
pub use types::*;

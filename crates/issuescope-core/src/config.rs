use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IssueScopeError, Result};

/// Top-level issuescope configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Default analysis window in days.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_include_closed")]
    pub include_closed: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            include_closed: default_include_closed(),
        }
    }
}

/// Which issue source backs the retrieval stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Deterministic generated data, no credentials required.
    Mock,
    /// Live GitHub REST API.
    Github,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_mode")]
    pub mode: SourceMode,
    /// Personal access token for the GitHub API. Supports `${ENV_VAR}`
    /// references in the config file.
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: default_source_mode(),
            github_token: None,
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_window_days() -> u32 {
    90
}

fn default_include_closed() -> bool {
    true
}

fn default_source_mode() -> SourceMode {
    SourceMode::Mock
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| IssueScopeError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| IssueScopeError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for vc in chars.by_ref() {
                if vc == '}' {
                    break;
                }
                var_name.push(vc);
            }
            match std::env::var(&var_name) {
                Ok(value) => result.push_str(&value),
                Err(_) => {
                    result.push_str("${");
                    result.push_str(&var_name);
                    result.push('}');
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_ISSUESCOPE_VAR", "expanded");
        let result = expand_env_vars("token = \"${TEST_ISSUESCOPE_VAR}\"");
        assert_eq!(result, "token = \"expanded\"");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("token = \"${NONEXISTENT_ISSUESCOPE_VAR}\"");
        assert_eq!(result, "token = \"${NONEXISTENT_ISSUESCOPE_VAR}\"");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.window_days, 90);
        assert!(config.analysis.include_closed);
        assert_eq!(config.source.mode, SourceMode::Mock);
        assert!(config.gateway.is_none());
    }
}

use std::io::Write;

use issuescope_core::config::{AppConfig, SourceMode};

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[analysis]
window_days = 30
include_closed = false

[source]
mode = "github"
github_token = "ghp_test_token"
api_base = "https://github.example.com/api/v3"

[gateway]
bind = "0.0.0.0:9999"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.analysis.window_days, 30);
    assert!(!config.analysis.include_closed);

    assert_eq!(config.source.mode, SourceMode::Github);
    assert_eq!(config.source.github_token, Some("ghp_test_token".to_string()));
    assert_eq!(config.source.api_base, "https://github.example.com/api/v3");

    let gw = config.gateway.expect("gateway present");
    assert_eq!(gw.bind, "0.0.0.0:9999");
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("ISSUESCOPE_TEST_TOKEN", "expanded-token-value");

    let toml_content = r#"
[source]
mode = "github"
github_token = "${ISSUESCOPE_TEST_TOKEN}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(
        config.source.github_token,
        Some("expanded-token-value".to_string())
    );

    std::env::remove_var("ISSUESCOPE_TEST_TOKEN");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[analysis]
window_days = 60
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.analysis.window_days, 60);
    assert!(config.analysis.include_closed);
    assert_eq!(config.source.mode, SourceMode::Mock);
    assert_eq!(config.source.api_base, "https://api.github.com");
    assert!(config.gateway.is_none());
}

#[test]
fn test_missing_file_is_config_not_found() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/issuescope.toml"))
        .expect_err("missing file should fail");
    assert!(err.to_string().contains("issuescope.toml"));
}

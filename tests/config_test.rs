//! Integration tests for configuration loading

use receipt_points::infra::{Config, LogFormat};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[server]
bind_address = "127.0.0.1"
port = 9191

[logging]
format = "json"

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.bind_address(), "127.0.0.1");
    assert_eq!(config.port(), 9191);
    assert_eq!(config.listen_addr(), "127.0.0.1:9191");
    assert_eq!(config.log_format(), LogFormat::Json);
    assert!(config.metrics_enabled());
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_metrics_disabled() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[metrics]\nenabled = false\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert!(!config.metrics_enabled());
    assert_eq!(config.metrics_interval_secs(), 30);
    assert_eq!(config.port(), 8080);
}

#[test]
fn test_from_file_invalid_toml() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server\nport = ").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.port(), 8080);
    assert_eq!(config.bind_address(), "0.0.0.0");
    assert_eq!(config.log_format(), LogFormat::Text);
    assert!(config.metrics_enabled());
    assert_eq!(config.config_file(), "default");
}

use std::io::Write;

use apphost::config::{Config, ConfigError};
use tempfile::NamedTempFile;

fn write_config(toml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(toml.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_full_config_from_file() {
    let file = write_config(
        r#"
        [logging]
        log_to_file = true
        log_file_path = "/tmp/apphost-test.log"
        level = "apphost=debug,dah=info"

        [storage]
        backend = "filesystem"

        [storage.options]
        path = "/tmp/apphost-test-output"

        [host]
        url = "http://localhost:8080/Host"
        application_url = "http://127.0.0.1:8081/Application"
        launch = ["viewer"]
        call_timeout_ms = 5000

        [application]
        url = "http://127.0.0.1:8081/Application"
        host_url = "http://127.0.0.1:8080/Host"
        max_connections = 4
    "#,
    );

    let config = Config::from_path(file.path()).expect("config loads");
    assert!(config.logging.log_to_file);
    assert_eq!(config.storage.backend, "filesystem");

    let host = config.host.expect("host section");
    let endpoint = host.application_endpoint().unwrap();
    assert_eq!(endpoint.call_timeout_ms, Some(5000));
    assert_eq!(host.exit_timeout().as_millis(), 10_000);

    let app = config.application.expect("application section");
    assert_eq!(app.server_config().unwrap().max_connections, 4);
}

#[test]
fn test_missing_file() {
    let err = Config::from_path("/nonexistent/apphost.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_invalid_file_contents() {
    let file = write_config("[host]\nexit_timeout_ms = \"soon\"\n");
    assert!(matches!(
        Config::from_path(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_worker_pool_must_not_be_empty() {
    let file = write_config("[application]\nmax_connections = 0\n");
    assert!(Config::from_path(file.path()).is_err());
}

#[test]
fn test_log_file_required_when_logging_to_file() {
    let file = write_config(
        r#"
        [logging]
        log_to_file = true
        log_file_path = ""

        [application]
    "#,
    );
    assert!(matches!(
        Config::from_path(file.path()),
        Err(ConfigError::InvalidValue {
            field: "logging.log_file_path",
            ..
        })
    ));
}

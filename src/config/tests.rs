#![cfg(test)]

use crate::config::config::{Config, ConfigError};

/// Parse a TOML string into a `Config` and run validation.
fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let cfg = Config::parse(toml_str)?;
    cfg.validate()?;
    Ok(cfg)
}

#[test]
fn test_basic_host_config() {
    let toml = r#"
        [logging]
        level = "debug"

        [storage]
        backend = "filesystem"
        options = { path = "/tmp/apphost-output" }

        [host]
        url = "http://127.0.0.1:9000/Host"
        application_url = "http://127.0.0.1:9001/Application"
        launch = ["/usr/local/bin/viewer", "--quiet"]
        exit_timeout_ms = 2500

        [host.screen]
        width = 1280
        height = 1024
    "#;

    let config = load_config_from_str(toml).expect("valid host config");
    let host = config.host.expect("host section");
    assert_eq!(config.logging.level, "debug");
    assert!(!config.logging.log_to_file);
    assert_eq!(host.launch.len(), 2);
    assert_eq!(host.exit_timeout().as_millis(), 2500);
    assert_eq!(host.screen.width, 1280);
    assert_eq!(host.screen.x, 0);

    let server = host.server_config().unwrap();
    assert_eq!(server.port, 9000);
    assert_eq!(server.path, "/Host");
    assert_eq!(host.application_endpoint().unwrap().url.port(), Some(9001));
}

#[test]
fn test_application_defaults() {
    let config = load_config_from_str("[application]\n").expect("defaults are valid");
    let app = config.application.expect("application section");
    assert_eq!(app.url, "http://127.0.0.1:8081/Application");
    assert_eq!(app.host_url, "http://127.0.0.1:8080/Host");
    assert!(app.call_timeout_ms.is_none());
}

#[test]
fn test_missing_role_rejected() {
    let result = load_config_from_str("[logging]\nlevel = \"warn\"\n");
    assert!(matches!(result, Err(ConfigError::NoRole)));
}

#[test]
fn test_invalid_urls_rejected() {
    let toml = r#"
        [host]
        url = "https://127.0.0.1:9000/Host"
    "#;
    assert!(matches!(
        load_config_from_str(toml),
        Err(ConfigError::InvalidUrl { section: "host", .. })
    ));

    let toml = r#"
        [application]
        host_url = "not a url"
    "#;
    assert!(matches!(
        load_config_from_str(toml),
        Err(ConfigError::InvalidUrl { section: "application", .. })
    ));
}

#[test]
fn test_invalid_values_rejected() {
    let toml = r#"
        [host]
        exit_timeout_ms = 0
    "#;
    assert!(matches!(
        load_config_from_str(toml),
        Err(ConfigError::InvalidValue { field: "host.exit_timeout_ms", .. })
    ));

    let toml = r#"
        [host.screen]
        width = 0
    "#;
    assert!(matches!(
        load_config_from_str(toml),
        Err(ConfigError::InvalidValue { field: "host.screen", .. })
    ));
}

#[test]
fn test_malformed_toml() {
    assert!(matches!(
        Config::parse("[host\nurl = "),
        Err(ConfigError::Parse(_))
    ));
}

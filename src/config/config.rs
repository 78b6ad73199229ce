use std::path::Path;
use std::time::Duration;

use dah::{DahError, PeerEndpoint, Rectangle, ServerConfig};
use serde::Deserialize;
use url::Url;

use crate::config::logging_config::LoggingConfig;
use crate::storage::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid [{section}] URL: {reason}")]
    InvalidUrl { section: &'static str, reason: String },
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("configuration has neither a [host] nor an [application] section")]
    NoRole,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub host: Option<HostConfig>,
    pub application: Option<ApplicationConfig>,
}

/// Settings for the Host role
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Service URL the host listens on
    #[serde(default = "default_host_url")]
    pub url: String,
    /// Service URL handed to the launched application
    #[serde(default = "default_application_url")]
    pub application_url: String,
    /// Application command line; the first element is the program
    #[serde(default)]
    pub launch: Vec<String>,
    #[serde(default = "default_exit_timeout_ms")]
    pub exit_timeout_ms: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
    #[serde(default)]
    pub screen: ScreenConfig,
}

/// Screen area the host makes available to applications
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScreenConfig {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default = "default_screen_width")]
    pub width: i32,
    #[serde(default = "default_screen_height")]
    pub height: i32,
}

/// Settings for the Hosted Application role
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationConfig {
    /// Service URL the application listens on
    #[serde(default = "default_application_url")]
    pub url: String,
    /// Service URL of the host
    #[serde(default = "default_host_url")]
    pub host_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

impl Config {
    /// Load and validate a configuration file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_none() && self.application.is_none() {
            return Err(ConfigError::NoRole);
        }
        if let Some(host) = &self.host {
            host.validate()?;
        }
        if let Some(application) = &self.application {
            application.validate()?;
        }
        if self.logging.log_to_file && self.logging.log_file_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_file_path",
                reason: "must be set when log_to_file is enabled".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: default_host_url(),
            application_url: default_application_url(),
            launch: Vec::new(),
            exit_timeout_ms: default_exit_timeout_ms(),
            max_connections: default_max_connections(),
            call_timeout_ms: None,
            screen: ScreenConfig::default(),
        }
    }
}

impl HostConfig {
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        server_config(&self.url, self.max_connections, "host")
    }

    pub fn application_endpoint(&self) -> Result<PeerEndpoint, ConfigError> {
        peer_endpoint(&self.application_url, self.call_timeout_ms, "host")
    }

    pub fn exit_timeout(&self) -> Duration {
        Duration::from_millis(self.exit_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server_config()?;
        self.application_endpoint()?;
        if self.exit_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "host.exit_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.launch.first().is_some_and(|program| program.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "host.launch",
                reason: "program name is empty".to_string(),
            });
        }
        if self.screen.width <= 0 || self.screen.height <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "host.screen",
                reason: "width and height must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: default_screen_width(),
            height: default_screen_height(),
        }
    }
}

impl From<ScreenConfig> for Rectangle {
    fn from(screen: ScreenConfig) -> Self {
        Rectangle::new(screen.x, screen.y, screen.width, screen.height)
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            url: default_application_url(),
            host_url: default_host_url(),
            max_connections: default_max_connections(),
            call_timeout_ms: None,
        }
    }
}

impl ApplicationConfig {
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        server_config(&self.url, self.max_connections, "application")
    }

    pub fn host_endpoint(&self) -> Result<PeerEndpoint, ConfigError> {
        peer_endpoint(&self.host_url, self.call_timeout_ms, "application")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server_config()?;
        self.host_endpoint()?;
        Ok(())
    }
}

fn server_config(
    url: &str,
    max_connections: usize,
    section: &'static str,
) -> Result<ServerConfig, ConfigError> {
    let config = ServerConfig {
        max_connections,
        ..ServerConfig::from_url(&parse_url(url, section)?).map_err(|e| invalid_url(section, e))?
    };
    config.validate().map_err(|e| invalid_url(section, e))?;
    Ok(config)
}

fn peer_endpoint(
    url: &str,
    call_timeout_ms: Option<u64>,
    section: &'static str,
) -> Result<PeerEndpoint, ConfigError> {
    let endpoint = PeerEndpoint {
        url: parse_url(url, section)?,
        call_timeout_ms,
    };
    endpoint.validate().map_err(|e| invalid_url(section, e))?;
    Ok(endpoint)
}

fn parse_url(url: &str, section: &'static str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        section,
        reason: format!("'{}': {}", url, e),
    })
}

fn invalid_url(section: &'static str, err: DahError) -> ConfigError {
    ConfigError::InvalidUrl {
        section,
        reason: err.to_string(),
    }
}

// Default value functions
fn default_host_url() -> String {
    local_url(dah::DEFAULT_HOST_PORT, "/Host")
}

fn default_application_url() -> String {
    local_url(dah::DEFAULT_APPLICATION_PORT, "/Application")
}

fn local_url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", port, path)
}

fn default_exit_timeout_ms() -> u64 {
    10_000
}

fn default_max_connections() -> usize {
    16
}

fn default_screen_width() -> i32 {
    1920
}

fn default_screen_height() -> i32 {
    1080
}

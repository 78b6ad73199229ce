//! Configuration types for hosting endpoints

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use url::Url;

use crate::error::{DahError, Result};

/// Configuration for a local Transport Server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the listener
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// Port for the listener (0 picks a free port)
    #[serde(default)]
    pub port: u16,

    /// Request path served by this endpoint, e.g. `/Host`
    #[serde(default = "default_path")]
    pub path: String,

    /// Maximum number of connections handled concurrently
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Largest request body accepted, in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Address of a remote hosting endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEndpoint {
    /// Service URL of the peer, e.g. `http://127.0.0.1:8081/Application`
    pub url: Url,

    /// Optional bound on a single call; no bound when absent
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: 0,
            path: default_path(),
            max_connections: default_max_connections(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Derive a listener configuration from a service URL
    pub fn from_url(url: &Url) -> Result<Self> {
        if url.scheme() != "http" {
            return Err(DahError::config(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                url
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| DahError::config(format!("missing host in {}", url)))?;
        let bind_addr = if host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            host.trim_matches(|c| c == '[' || c == ']')
                .parse::<IpAddr>()
                .map_err(|e| DahError::config(format!("invalid bind host '{}': {}", host, e)))?
        };

        Ok(Self {
            bind_addr,
            port: url.port_or_known_default().unwrap_or(0),
            path: url.path().to_string(),
            ..Default::default()
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(DahError::config("Service path must start with '/'"));
        }

        if self.max_connections == 0 {
            return Err(DahError::config(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_body_bytes < 1024 {
            return Err(DahError::config(
                "max_body_bytes must be at least 1024 bytes",
            ));
        }

        Ok(())
    }
}

impl PeerEndpoint {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            call_timeout_ms: None,
        }
    }

    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| DahError::config(format!("invalid peer URL '{}': {}", url, e)))?;
        let endpoint = Self::new(url);
        endpoint.validate()?;
        Ok(endpoint)
    }

    /// Bound each call to this peer
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.scheme() != "http" {
            return Err(DahError::config(format!(
                "Peer URL must use http, got '{}'",
                self.url.scheme()
            )));
        }

        if self.url.host_str().map_or(true, str::is_empty) {
            return Err(DahError::config("Peer URL must name a host"));
        }

        if self.call_timeout_ms == Some(0) {
            return Err(DahError::config("call_timeout_ms must be greater than 0"));
        }

        Ok(())
    }
}

// Default value functions
fn default_bind_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_path() -> String {
    "/".to_string()
}

fn default_max_connections() -> usize {
    16
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

//! Transport Client performing one blocking remote call per invocation

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::{self, MethodCall, Reply};
use crate::config::PeerEndpoint;
use crate::framing::JSON_CONTENT_TYPE;
use crate::{DahError, Result};

/// Sends method calls to one peer endpoint
#[derive(Debug, Clone)]
pub struct TransportClient {
    endpoint: PeerEndpoint,
    http: reqwest::Client,
}

impl TransportClient {
    /// Create a client for `endpoint`.
    ///
    /// Every call opens a new connection; no idle connections are kept.
    pub fn new(endpoint: PeerEndpoint) -> Result<Self> {
        endpoint.validate()?;

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy();
        if let Some(timeout) = endpoint.call_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| DahError::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &PeerEndpoint {
        &self.endpoint
    }

    /// Perform one call and wait for its correlated reply.
    ///
    /// Connection failures are returned as [`DahError::Transport`]; a fault
    /// reply from the peer is returned as [`Reply::Fault`].
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Reply> {
        let url = &self.endpoint.url;
        let body = codec::encode_call(&MethodCall::new(method, params))?;
        debug!("Calling {} on {}", method, url);

        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| DahError::transport(format!("{} to {} failed: {}", method, url, e)))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            DahError::transport(format!("reading {} reply from {} failed: {}", method, url, e))
        })?;

        match codec::decode_reply(&bytes) {
            Ok(reply) => {
                if let Reply::Fault(fault) = &reply {
                    warn!("{} on {} answered with fault: {}", method, url, fault);
                }
                Ok(reply)
            }
            Err(e) if status.is_success() => Err(e),
            Err(_) => Err(DahError::transport(format!(
                "{} on {} returned HTTP {}: {}",
                method,
                url,
                status,
                String::from_utf8_lossy(&bytes)
            ))),
        }
    }

    /// Perform one call and decode its result, turning a fault into an error
    pub async fn invoke<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        self.call(method, params).await?.into_result()
    }
}

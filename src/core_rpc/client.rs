//! Best-effort `get_config` call to the core service.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{CoreConfigUpdate, WebConfig};
use crate::observability::metrics;

/// Fixed deadline for the `get_config` request.
pub const CORE_RPC_TIMEOUT: Duration = Duration::from_secs(3);

/// Characters left unescaped in the request body: unreserved plus `/`.
const QUOTE_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    data: Option<CoreConfigUpdate>,
}

/// Why the core service could not provide its configuration.
#[derive(Debug, Error)]
pub enum CoreRpcError {
    #[error("core server unreachable: {0}")]
    Connect(String),
    #[error("core server did not answer within {0:?}")]
    Timeout(Duration),
    #[error("core server returned status {0}")]
    Status(u16),
    #[error("malformed core server response: {0}")]
    Malformed(String),
    #[error("core server response has no data field")]
    MissingData,
}

impl CoreRpcError {
    /// Short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CoreRpcError::Connect(_) => "connect",
            CoreRpcError::Timeout(_) => "timeout",
            CoreRpcError::Status(_) => "status",
            CoreRpcError::Malformed(_) => "malformed",
            CoreRpcError::MissingData => "missing_data",
        }
    }
}

/// Result of the startup `get_config` request.
#[derive(Debug)]
pub enum CoreFetchOutcome {
    /// `data` was merged into `WebConfig.core`.
    Merged,
    /// Nothing was merged; previous values are untouched.
    Unavailable(CoreRpcError),
}

impl CoreFetchOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, CoreFetchOutcome::Merged)
    }
}

/// Client for the core service JSON-RPC endpoint.
#[derive(Clone)]
pub struct CoreClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl CoreClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, CORE_RPC_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Encoded body for a method call with no parameters.
    pub fn encode_request(method: &str) -> String {
        let json = serde_json::json!({ "method": method, "param": [] }).to_string();
        utf8_percent_encode(&json, QUOTE_SAFE).to_string()
    }

    /// Ask the core service for its configuration.
    pub async fn get_config(&self) -> Result<CoreConfigUpdate, CoreRpcError> {
        let body = Self::encode_request("get_config");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreRpcError::Status(status.as_u16()));
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        let envelope: RpcEnvelope =
            serde_json::from_str(&text).map_err(|e| CoreRpcError::Malformed(e.to_string()))?;
        envelope.data.ok_or(CoreRpcError::MissingData)
    }

    /// Fetch and merge into `config.core`. Failures are logged and returned
    /// as `Unavailable` with the config left as it was.
    pub async fn fetch_into(&self, config: &mut WebConfig) -> CoreFetchOutcome {
        match self.get_config().await {
            Ok(update) => {
                config.core.merge(update);
                tracing::debug!(
                    endpoint = %self.endpoint,
                    version = ?config.core.version,
                    "Fetched configuration from core server"
                );
                metrics::record_core_fetch("merged");
                CoreFetchOutcome::Merged
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    error = %e,
                    "Can not get config from core server, it may not be started yet; ignoring"
                );
                metrics::record_core_fetch(e.as_label());
                CoreFetchOutcome::Unavailable(e)
            }
        }
    }

    fn classify(&self, e: reqwest::Error) -> CoreRpcError {
        if e.is_timeout() {
            CoreRpcError::Timeout(self.timeout)
        } else if e.is_decode() || e.is_body() {
            CoreRpcError::Malformed(e.to_string())
        } else {
            CoreRpcError::Connect(e.to_string())
        }
    }
}

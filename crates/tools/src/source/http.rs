use std::time::Duration;

use async_trait::async_trait;
use finmcp_core::config::HttpSourceConfig;
use finmcp_core::{AdapterFailure, Error, FailureKind, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{AdapterResult, HttpSource};
use crate::normalize::{clean_value, sanitize_non_finite};

/// `HttpSource` over a shared reqwest client with a fixed deadline and
/// browser identification.
pub struct ReqwestHttpSource {
    client: Client,
    referer: String,
    timeout_secs: u64,
}

impl ReqwestHttpSource {
    pub fn new(config: &HttpSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            referer: config.referer.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn request_failure(&self, endpoint: &str, e: reqwest::Error) -> AdapterFailure {
        if e.is_timeout() {
            AdapterFailure::timeout(format!(
                "Request to {} timed out after {} seconds",
                endpoint, self.timeout_secs
            ))
        } else {
            AdapterFailure::network(format!("API call failed: {}", e))
        }
    }
}

#[async_trait]
impl HttpSource for ReqwestHttpSource {
    async fn get(&self, endpoint: &str, query: &[(String, String)]) -> AdapterResult {
        debug!(endpoint, params = query.len(), "HTTP GET");
        let resp = self
            .client
            .get(endpoint)
            .query(query)
            .header("Referer", &self.referer)
            .send()
            .await
            .map_err(|e| self.request_failure(endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AdapterFailure::new(
                FailureKind::Status,
                format!("API call failed: {} returned {}", endpoint, status),
            )
            .with_status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| self.request_failure(endpoint, e))?;
        debug!(endpoint, bytes = body.len(), "HTTP response");
        Ok(body_to_value(body))
    }
}

/// Parse JSON-looking bodies; everything else stays raw text for the
/// normalizer.
pub(crate) fn body_to_value(body: String) -> Value {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(&sanitize_non_finite(trimmed)) {
            return clean_value(value);
        }
    }
    Value::String(body)
}

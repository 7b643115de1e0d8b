//! HTTP client for the remote session authority.

use async_trait::async_trait;
use mindshift_core::authority::{AuthorityReply, AuthorityRequest, SessionAuthority};
use mindshift_core::config::AuthorityConfig;
use mindshift_core::error::{Result, ShiftError};
use reqwest::Client;

/// Posts one JSON request per user action to the authority endpoint.
///
/// Unreachable hosts, non-2xx statuses and unreadable bodies are all
/// transport failures. A readable `success: false` body is returned as-is
/// and judged by the orchestrator.
#[derive(Debug, Clone)]
pub struct HttpSessionAuthority {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpSessionAuthority {
    pub fn new(config: &AuthorityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ShiftError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SessionAuthority for HttpSessionAuthority {
    async fn exchange(&self, request: &AuthorityRequest) -> Result<AuthorityReply> {
        let mut builder = self.client.post(&self.url).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            ShiftError::transport(format!("Failed to reach session service: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                session_id = %request.session_id,
                action = %request.action,
                status = status.as_u16(),
                "Session service returned an error status"
            );
            return Err(ShiftError::transport(format!(
                "Session service error ({}): {}",
                status, error_text
            )));
        }

        response.json::<AuthorityReply>().await.map_err(|e| {
            ShiftError::transport(format!("Failed to parse session service reply: {}", e))
        })
    }
}

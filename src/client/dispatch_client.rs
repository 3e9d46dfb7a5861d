// Dispatch service client
//
// Used by the gateway to health-check the dispatch service and forward tool
// requests to it.

use anyhow::{Context, Result};
use axum::body::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::GatewayConfig;
use crate::tools::ToolKind;

/// Failure talking to the dispatch service
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// `/health` answered with a non-200 status
    #[error("API server health check failed: {status}")]
    Unhealthy { status: u16, details: String },

    /// `/health` could not be reached at all
    #[error("API server is not responding: {0}")]
    Unreachable(String),

    /// The forward itself failed at the transport level
    #[error("Error executing tool: {0}")]
    Transport(String),
}

/// Raw upstream answer, relayed by the gateway
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct DispatchClient {
    base_url: String,
    client: Client,
    health_timeout: Duration,
    forward_timeout: Duration,
}

impl DispatchClient {
    pub fn new(base_url: &str, health_timeout: Duration, forward_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            health_timeout,
            forward_timeout,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            config.health_timeout(),
            config.forward_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full dispatch URL for a tool
    pub fn tool_url(&self, kind: ToolKind) -> String {
        format!("{}{}", self.base_url, kind.api_path())
    }

    /// GET /health on the dispatch service
    pub async fn probe(&self) -> Result<UpstreamResponse, UpstreamError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        read_response(response)
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))
    }

    /// Fail unless the dispatch service answers its health check with 200
    pub async fn check_health(&self) -> Result<(), UpstreamError> {
        let response = self.probe().await.map_err(|e| {
            error!(error = %e, "API server health check failed");
            e
        })?;

        if response.status != 200 {
            error!(status = response.status, "API server health check failed");
            return Err(UpstreamError::Unhealthy {
                status: response.status,
                details: response.body,
            });
        }

        Ok(())
    }

    /// POST the request body unchanged to the tool's dispatch route
    pub async fn forward(&self, kind: ToolKind, body: Bytes) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.tool_url(kind);
        debug!(url = %url, "Sending request to dispatch service");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .timeout(self.forward_timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        read_response(response)
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))
    }
}

async fn read_response(response: reqwest::Response) -> reqwest::Result<UpstreamResponse> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;

    Ok(UpstreamResponse {
        status,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> DispatchClient {
        DispatchClient::new(url, Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_tool_url() {
        let client = client("http://localhost:5000/");
        assert_eq!(client.tool_url(ToolKind::Nmap), "http://localhost:5000/api/tools/nmap");
    }

    #[tokio::test]
    async fn test_unhealthy_status_carries_details() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client(&server.url()).check_health().await.unwrap_err();
        match err {
            UpstreamError::Unhealthy { status, details } => {
                assert_eq!(status, 500);
                assert_eq!(details, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forward_posts_body_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"target": "10.0.0.1",  "ports":"22"}"#;
        let mock = server
            .mock("POST", "/api/tools/nmap")
            .match_header("content-type", "application/json")
            .match_body(body)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"stdout":"","stderr":"","return_code":0,"success":true}"#)
            .create_async()
            .await;

        let response = client(&server.url())
            .forward(ToolKind::Nmap, Bytes::from(body))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert!(response.is_json());
    }
}

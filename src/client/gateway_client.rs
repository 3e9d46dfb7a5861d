// Gateway client for the chat loop

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::tools::{ExecutionResult, ToolKind};

/// Gateway response envelope
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GatewayReply {
    Success {
        tool: String,
        results: ExecutionResult,
    },
    Error {
        message: String,
        #[serde(default)]
        code: Option<u16>,
    },
}

pub struct GatewayClient {
    base_url: String,
    client: Client,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // Tools may run for the full executor ceiling
        let client = Client::builder()
            .timeout(Duration::from_secs(330))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the gateway is reachable
    pub async fn check_health(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .with_context(|| format!("Gateway not reachable at {}", self.base_url))?;

        if !response.status().is_success() {
            anyhow::bail!("Gateway health check failed: {}", response.status());
        }
        Ok(())
    }

    /// Run a tool through the gateway
    pub async fn invoke(&self, kind: ToolKind, params: &Map<String, Value>) -> Result<GatewayReply> {
        let url = format!("{}/mcp/tools/kali_tools/{}", self.base_url, kind);
        info!(tool = %kind, params = ?params, "Invoking tool through gateway");

        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .await
            .with_context(|| format!("Gateway not reachable at {}", self.base_url))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read gateway response")?;
        debug!(status, body = %body, "Gateway response");

        Ok(serde_json::from_str(&body).unwrap_or_else(|_| GatewayReply::Error {
            message: format!("Unexpected gateway response: {}", body),
            code: Some(status),
        }))
    }
}

// MCP gateway
//
// Accepts "invoke tool by name" requests, checks the dispatch service is up,
// forwards the body unchanged and relays the result.

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::debug::{debug_router, DebugState};
use super::middleware::track_requests;
use crate::client::{DispatchClient, UpstreamError};
use crate::config::Config;
use crate::metrics::ToolMetrics;
use crate::tools::{ToolKind, ToolRegistry};

pub const SERVER_NAME: &str = "Kali Linux Tools MCP Server";
pub const PROTOCOL_VERSION: &str = "0.1";

/// Why a gateway call did not produce a success envelope
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Error parsing API response: {message}")]
    MalformedResponse { message: String, raw_response: String },

    #[error("Tool execution failed: {body}")]
    ToolFailed { status: u16, body: String },

    #[error("Server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Metric label for this failure
    pub fn outcome(&self) -> &'static str {
        match self {
            GatewayError::UnknownTool(_) => "unknown_tool",
            GatewayError::Upstream(UpstreamError::Transport(_)) => "transport_error",
            GatewayError::Upstream(_) => "unavailable",
            GatewayError::MalformedResponse { .. } => "malformed_response",
            GatewayError::ToolFailed { .. } => "tool_failed",
            GatewayError::Internal(_) => "error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        let (status, body) = match self {
            GatewayError::UnknownTool(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": message }),
            ),
            GatewayError::Upstream(UpstreamError::Unhealthy { details, .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "status": "error", "message": message, "details": details }),
            ),
            GatewayError::Upstream(UpstreamError::Unreachable(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "status": "error", "message": message }),
            ),
            GatewayError::Upstream(UpstreamError::Transport(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "status": "error", "message": message }),
            ),
            GatewayError::MalformedResponse { raw_response, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "status": "error", "message": message, "raw_response": raw_response }),
            ),
            GatewayError::ToolFailed { status, .. } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "status": "error", "message": message, "code": status }),
            ),
            GatewayError::Internal(e) => {
                tracing::error!(error = ?e, "Gateway request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": "error", "message": message }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub struct GatewayServer {
    client: DispatchClient,
    metrics: ToolMetrics,
    debug: Arc<DebugState>,
    bind_address: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(config: &Config, client: DispatchClient) -> Result<Self> {
        Ok(Self {
            client,
            metrics: ToolMetrics::new().context("Failed to register gateway metrics")?,
            debug: Arc::new(DebugState::new(
                config.debug.enabled,
                "MCP Server",
                config.debug.history_capacity,
            )),
            bind_address: config.gateway.bind_address(),
            port: config.gateway.port,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = DispatchClient::from_config(&config.gateway)?;
        Self::new(config, client)
    }

    pub fn router(self: Arc<Self>) -> Router {
        let debug = Arc::clone(&self.debug);

        Router::new()
            .route("/mcp/capabilities", get(capabilities))
            .route("/mcp/tools/kali_tools/:tool_name", post(execute_tool))
            .route("/mcp/prompts/pentesting", get(pentesting_prompts))
            .route("/mcp/context/htb", get(htb_context))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_endpoint))
            .route("/debug/config", get(debug_config))
            .route("/debug/test-api", get(debug_test_api))
            .with_state(self)
            .merge(debug_router(Arc::clone(&debug)))
            .layer(middleware::from_fn_with_state(debug, track_requests))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.bind_address)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind_address))?;
        self.serve_on(listener, shutdown).await
    }

    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Connecting to Kali Linux API at {}", self.client.base_url());
        let debug = self.debug.enabled;
        let app = Arc::new(self).router();
        super::serve_router(listener, app, shutdown, SERVER_NAME, debug).await
    }

    async fn relay(&self, tool_name: &str, body: Bytes) -> Result<Value, GatewayError> {
        let kind: ToolKind = tool_name
            .parse()
            .map_err(|_| GatewayError::UnknownTool(tool_name.to_string()))?;

        tracing::info!(tool = %kind, body_bytes = body.len(), "Executing tool");

        // Fail fast when the dispatch service is down
        self.client.check_health().await?;

        let response = self.client.forward(kind, body).await?;
        if response.status != 200 {
            tracing::error!(
                tool = %kind,
                status = response.status,
                body = %response.body,
                "Tool execution failed"
            );
            return Err(GatewayError::ToolFailed {
                status: response.status,
                body: response.body,
            });
        }

        let results: Value =
            serde_json::from_str(&response.body).map_err(|e| GatewayError::MalformedResponse {
                message: e.to_string(),
                raw_response: response.body.clone(),
            })?;

        tracing::info!(tool = %kind, "Tool executed successfully");
        Ok(json!({
            "status": "success",
            "tool": kind.as_str(),
            "results": results,
        }))
    }
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = super::panic_message(payload.as_ref());
    GatewayError::Internal(anyhow::anyhow!(message)).into_response()
}

/// Handle POST /mcp/tools/kali_tools/:tool_name
async fn execute_tool(
    State(gateway): State<Arc<GatewayServer>>,
    Path(tool_name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, GatewayError> {
    match gateway.relay(&tool_name, body).await {
        Ok(envelope) => {
            gateway.metrics.record_forward(&tool_name, "success");
            Ok(Json(envelope))
        }
        Err(e) => {
            tracing::warn!(tool = %tool_name, error = %e, "Tool request failed");
            // Unknown names are not used as labels
            let label = match &e {
                GatewayError::UnknownTool(_) => "unknown",
                _ => tool_name.as_str(),
            };
            gateway.metrics.record_forward(label, e.outcome());
            Err(e)
        }
    }
}

/// Handle GET /mcp/capabilities
async fn capabilities() -> Json<Value> {
    Json(json!({
        "protocol_version": PROTOCOL_VERSION,
        "server_name": SERVER_NAME,
        "server_version": env!("CARGO_PKG_VERSION"),
        "capabilities": [{
            "type": "tool",
            "name": "kali_tools",
            "description": "Access to Kali Linux security testing tools",
            "authentication_required": false,
            "actions": ToolKind::names(),
            "tools": ToolRegistry::definitions(),
        }],
    }))
}

/// Handle GET /mcp/prompts/pentesting
async fn pentesting_prompts() -> Json<Value> {
    Json(json!({
        "prompts": [
            {
                "name": "initial_recon",
                "description": "Prompt for initial reconnaissance of a target",
                "text": "Perform initial reconnaissance on the target {target_ip}. Start with passive techniques followed by port scanning and service enumeration."
            },
            {
                "name": "vulnerability_assessment",
                "description": "Prompt for vulnerability assessment",
                "text": "Based on the services discovered on {target_ip}, identify potential vulnerabilities and suggest exploitation techniques."
            },
            {
                "name": "web_application_testing",
                "description": "Prompt for web application testing",
                "text": "Analyze the web application at {target_url} for common vulnerabilities including SQLi, XSS, CSRF, and directory traversal."
            },
            {
                "name": "privilege_escalation",
                "description": "Prompt for privilege escalation",
                "text": "I have a user-level shell on the target. Help me enumerate the system and identify privilege escalation vectors."
            }
        ]
    }))
}

/// Handle GET /mcp/context/htb
async fn htb_context() -> Json<Value> {
    Json(json!({
        "context": {
            "htb_basics": "HackTheBox machines are isolated environments designed for security testing. They typically have vulnerabilities that represent real-world scenarios.",
            "difficulty_levels": [
                {"name": "Easy", "description": "Basic vulnerabilities requiring fundamental penetration testing knowledge."},
                {"name": "Medium", "description": "More complex vulnerabilities requiring chaining multiple techniques."},
                {"name": "Hard", "description": "Sophisticated vulnerabilities requiring advanced knowledge and custom exploit development."},
                {"name": "Insane", "description": "Extremely difficult challenges involving advanced techniques, custom exploits, and creative problem-solving."}
            ],
            "approach": "For any HTB machine, follow a methodical approach: reconnaissance, enumeration, vulnerability discovery, exploitation, post-exploitation, and privilege escalation."
        }
    }))
}

/// Handle GET /health - gateway status plus an upstream probe
async fn health_check(State(gateway): State<Arc<GatewayServer>>) -> Json<Value> {
    let (api_status, api_message) = match gateway.client.probe().await {
        Ok(response) if response.status == 200 => ("healthy", String::new()),
        Ok(response) => ("unhealthy", format!("Status code: {}", response.status)),
        Err(e) => ("unhealthy", e.to_string()),
    };

    Json(json!({
        "status": "healthy",
        "message": "MCP Server is running",
        "api_server": {
            "status": api_status,
            "url": gateway.client.base_url(),
            "message": api_message,
        }
    }))
}

async fn metrics_endpoint(State(gateway): State<Arc<GatewayServer>>) -> Result<Response, GatewayError> {
    let body = gateway.metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Handle GET /debug/config
async fn debug_config(State(gateway): State<Arc<GatewayServer>>) -> Response {
    if let Err(denied) = gateway.debug.require_enabled() {
        return denied;
    }

    let endpoints: Map<String, Value> = ToolKind::ALL
        .iter()
        .map(|kind| (kind.as_str().to_string(), Value::String(gateway.client.tool_url(*kind))))
        .collect();

    Json(json!({
        "mcp_port": gateway.port,
        "kali_api_base_url": gateway.client.base_url(),
        "available_tools": ToolKind::names(),
        "api_endpoints": endpoints,
        "debug_mode": gateway.debug.enabled,
    }))
    .into_response()
}

/// Handle GET /debug/test-api
async fn debug_test_api(State(gateway): State<Arc<GatewayServer>>) -> Response {
    if let Err(denied) = gateway.debug.require_enabled() {
        return denied;
    }

    match gateway.client.probe().await {
        Ok(response) => {
            let api_response = if response.is_json() {
                serde_json::from_str(&response.body).unwrap_or(Value::String(response.body.clone()))
            } else {
                Value::String(response.body.clone())
            };

            Json(json!({
                "status": "success",
                "api_status_code": response.status,
                "api_response": api_response,
            }))
            .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "error",
                "message": format!("Error connecting to API server: {}", e),
            })),
        )
            .into_response(),
    }
}

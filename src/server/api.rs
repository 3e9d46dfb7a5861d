// Tool dispatch service
//
// One POST route per tool. Bodies are validated and turned into command lines
// before anything is executed.

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::debug::{debug_router, DebugState};
use super::error::ApiError;
use super::middleware::track_requests;
use crate::config::Config;
use crate::metrics::ToolMetrics;
use crate::tools::validation::{check_allowed, SERVICE};
use crate::tools::{
    CommandBuilder, CommandExecutor, ExecutionResult, ShellExecutor, ToolDispatcher, ToolKind,
    ValidationError,
};

/// Read-only commands accepted by `/debug/command`
const DEBUG_COMMANDS: [&str; 9] = [
    "ls", "ps", "id", "whoami", "which", "whereis", "cat", "head", "tail",
];
const UNSAFE_SEQUENCES: [&str; 6] = [";", "|", "&&", "||", ">", "<"];

pub struct ApiServer {
    dispatcher: ToolDispatcher,
    metrics: ToolMetrics,
    debug: Arc<DebugState>,
    essential_tools: Vec<String>,
    bind_address: String,
}

impl ApiServer {
    pub fn new(config: &Config, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        let builder = CommandBuilder::new(config.executor.field_policy());

        Ok(Self {
            dispatcher: ToolDispatcher::new(builder, executor)
                .with_script_dir(config.executor.script_dir.clone()),
            metrics: ToolMetrics::new().context("Failed to register dispatch metrics")?,
            debug: Arc::new(DebugState::new(
                config.debug.enabled,
                "Kali API Server",
                config.debug.history_capacity,
            )),
            essential_tools: config.api.essential_tools.clone(),
            bind_address: config.api.bind_address(),
        })
    }

    /// Server backed by a real shell
    pub fn from_config(config: &Config) -> Result<Self> {
        let executor = ShellExecutor::new(config.executor.timeout())
            .with_shell(config.executor.shell.clone());
        Self::new(config, Arc::new(executor))
    }

    pub fn debug(&self) -> &Arc<DebugState> {
        &self.debug
    }

    pub fn router(self: Arc<Self>) -> Router {
        let debug = Arc::clone(&self.debug);

        Router::new()
            .route("/api/tools/:tool", post(run_tool))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_endpoint))
            .route("/debug/tool-test", post(debug_tool_test))
            .route("/debug/command", post(debug_command))
            .with_state(self)
            .merge(debug_router(Arc::clone(&debug)))
            .layer(middleware::from_fn_with_state(debug, track_requests))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until `shutdown` resolves
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
        let debug = self.debug.enabled;
        let app = Arc::new(self).router();
        super::serve_router(listener, app, shutdown, "Kali Linux Tools API Server", debug).await
    }

    async fn execute(&self, command: &str) -> ExecutionResult {
        self.dispatcher.executor().execute(command).await
    }
}

/// Panics inside a handler become the usual 500 body
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = super::panic_message(payload.as_ref());
    ApiError::Internal(anyhow::anyhow!(message)).into_response()
}

/// Handle POST /api/tools/:tool
async fn run_tool(
    State(server): State<Arc<ApiServer>>,
    Path(tool): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let kind: ToolKind = tool.parse()?;
    let Json(body) = body.map_err(|e| ValidationError::InvalidBody(e.body_text()))?;

    let command = match server.dispatcher.prepare(kind, body) {
        Ok(command) => command,
        Err(e) => {
            server.metrics.record_rejection(kind);
            return Err(e.into());
        }
    };

    tracing::debug!(tool = %kind, command = ?command, "Executing tool command");
    let start = Instant::now();
    let result = server.dispatcher.run(&command).await?;
    server
        .metrics
        .record_execution(kind, &result, start.elapsed());

    tracing::info!(
        tool = %kind,
        return_code = result.return_code,
        success = result.success,
        "Tool finished"
    );
    Ok(Json(result))
}

/// Handle GET /health - probe essential tools with `which`
async fn health_check(State(server): State<Arc<ApiServer>>) -> Json<Value> {
    let mut tools_status = BTreeMap::new();

    for tool in &server.essential_tools {
        let available = if check_allowed("tool", tool, SERVICE).is_ok() {
            server.execute(&format!("which {}", tool)).await.success
        } else {
            false
        };
        tools_status.insert(tool.clone(), available);
    }

    let all_available = tools_status.values().all(|available| *available);

    Json(json!({
        "status": "healthy",
        "message": "Kali Linux Tools API Server is running",
        "tools_status": tools_status,
        "all_essential_tools_available": all_available,
    }))
}

/// Handle GET /metrics - Prometheus text format
async fn metrics_endpoint(State(server): State<Arc<ApiServer>>) -> Result<Response, ApiError> {
    let body = server.metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "message": message.into() })),
    )
        .into_response()
}

/// Pull a non-empty string field out of an optional JSON body
fn string_field(body: &Result<Json<Value>, JsonRejection>, field: &str) -> Option<String> {
    body.as_ref()
        .ok()
        .and_then(|Json(value)| value.get(field))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Handle POST /debug/tool-test - check that a tool is installed
async fn debug_tool_test(
    State(server): State<Arc<ApiServer>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if let Err(denied) = server.debug.require_enabled() {
        return denied;
    }

    let Some(tool) = string_field(&body, "tool") else {
        return bad_request("Tool parameter is required");
    };
    if let Err(e) = check_allowed("tool", &tool, SERVICE) {
        return bad_request(e.to_string());
    }

    let result = server.execute(&format!("{} --version", tool)).await;
    if result.success {
        return Json(json!({
            "status": "success",
            "tool": tool,
            "installed": true,
            "version": result.stdout.trim(),
            "command_output": result,
        }))
        .into_response();
    }

    let result = server.execute(&format!("{} --help", tool)).await;
    Json(json!({
        "status": "warning",
        "tool": tool,
        "installed": result.success,
        "help_output": result.success.then(|| result.stdout.clone()),
        "error": (!result.success).then(|| result.stderr.clone()),
        "command_output": result,
    }))
    .into_response()
}

/// Handle POST /debug/command - run an allow-listed read-only command
async fn debug_command(
    State(server): State<Arc<ApiServer>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if let Err(denied) = server.debug.require_enabled() {
        return denied;
    }

    let Some(command) = string_field(&body, "command") else {
        return bad_request("Command parameter is required");
    };

    if UNSAFE_SEQUENCES.iter().any(|s| command.contains(s)) {
        tracing::warn!(command = %command, "Unsafe debug command rejected");
        return bad_request("Unsafe command rejected");
    }

    if !DEBUG_COMMANDS.iter().any(|allowed| command.starts_with(allowed)) {
        return bad_request(format!(
            "Command not allowed. Allowed commands: {}",
            DEBUG_COMMANDS.join(", ")
        ));
    }

    let output = server.execute(&command).await;
    Json(json!({
        "status": "success",
        "command": command,
        "output": output,
    }))
    .into_response()
}

// Debug endpoints shared by both servers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;

use super::history::RequestHistory;

/// Debug switch and history for one server
pub struct DebugState {
    pub enabled: bool,
    pub server_type: &'static str,
    pub history: Arc<RequestHistory>,
}

impl DebugState {
    pub fn new(enabled: bool, server_type: &'static str, history_capacity: usize) -> Self {
        Self {
            enabled,
            server_type,
            history: Arc::new(RequestHistory::new(history_capacity)),
        }
    }

    /// Err with a 403 response when debug mode is off
    pub fn require_enabled(&self) -> Result<(), Response> {
        if self.enabled {
            Ok(())
        } else {
            Err(debug_disabled())
        }
    }
}

pub fn debug_disabled() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "status": "error",
            "message": "Debug mode is not enabled"
        })),
    )
        .into_response()
}

/// `/debug/status`, `/debug/history` and `/debug/clear`
pub fn debug_router(state: Arc<DebugState>) -> Router {
    Router::new()
        .route("/debug/status", get(debug_status))
        .route("/debug/history", get(debug_history))
        .route("/debug/clear", post(debug_clear))
        .with_state(state)
}

async fn debug_status(State(debug): State<Arc<DebugState>>) -> Response {
    if let Err(denied) = debug.require_enabled() {
        return denied;
    }

    let started_at = debug.history.started_at();
    let uptime = (chrono::Utc::now() - started_at).num_milliseconds() as f64 / 1000.0;

    Json(json!({
        "status": "healthy",
        "server_type": debug.server_type,
        "debug_level": "DEBUG",
        "version": env!("CARGO_PKG_VERSION"),
        "start_time": started_at.to_rfc3339(),
        "uptime_seconds": uptime,
        "request_count": debug.history.request_count(),
    }))
    .into_response()
}

async fn debug_history(State(debug): State<Arc<DebugState>>) -> Response {
    if let Err(denied) = debug.require_enabled() {
        return denied;
    }

    Json(json!({ "history": debug.history.snapshot() })).into_response()
}

async fn debug_clear(State(debug): State<Arc<DebugState>>) -> Response {
    if let Err(denied) = debug.require_enabled() {
        return denied;
    }

    debug.history.clear();
    Json(json!({
        "status": "success",
        "message": "Request history cleared"
    }))
    .into_response()
}

/// Log a short system summary at startup in debug mode
pub fn log_system_info() {
    use sysinfo::{Disks, System};

    let system = System::new_all();
    let gib = |bytes: u64| bytes as f64 / (1024.0 * 1024.0 * 1024.0);

    let root_disk = Disks::new_with_refreshed_list()
        .list()
        .iter()
        .find(|disk| disk.mount_point() == std::path::Path::new("/"))
        .map(|disk| disk.total_space())
        .unwrap_or(0);

    tracing::info!("=== System Information ===");
    tracing::info!(
        "Platform: {}",
        System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string())
    );
    tracing::info!("Arch: {}", std::env::consts::ARCH);
    tracing::info!("CPU Cores: {}", system.cpus().len());
    tracing::info!("Memory: {:.2} GB", gib(system.total_memory()));
    tracing::info!("Disk: {:.2} GB", gib(root_disk));
    tracing::info!("==========================");
}

// HTTP servers: tool dispatch service and MCP gateway

mod api;
mod debug;
mod error;
mod gateway;
mod history;
mod middleware;

pub use api::ApiServer;
pub use debug::{log_system_info, DebugState};
pub use error::ApiError;
pub use gateway::{GatewayError, GatewayServer, PROTOCOL_VERSION, SERVER_NAME};
pub use history::{HistoryEntry, RequestHistory, RequestRecord, ResponseRecord};

use anyhow::{Context, Result};
use axum::Router;
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Serve `app` on `listener` until `shutdown` resolves
async fn serve_router<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    name: &str,
    debug: bool,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    if debug {
        tracing::info!("Debug mode enabled - additional endpoints available at /debug/*");
    }
    tracing::info!("Starting {} on {}", name, addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
        .with_context(|| format!("{} failed", name))?;

    tracing::info!("{} stopped", name);
    Ok(())
}

/// Text of a caught handler panic
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            // Without a signal handler, run until killed
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await
        }
    }
}

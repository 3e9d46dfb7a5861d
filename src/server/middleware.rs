// Request tracking middleware
//
// In debug mode every request and its JSON response are recorded in the
// server's RequestHistory.

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::debug::DebugState;
use super::history::{RequestRecord, ResponseRecord};

/// Largest request body buffered for the history
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub async fn track_requests(
    State(debug): State<Arc<DebugState>>,
    request: Request,
    next: Next,
) -> Response {
    if !debug.enabled {
        return next.run(request).await;
    }

    let start = Instant::now();
    let id = uuid::Uuid::new_v4().to_string();

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    debug.history.push_request(RequestRecord {
        id: id.clone(),
        timestamp: chrono::Utc::now(),
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        remote_addr,
        headers: header_map(&parts.headers),
        body: json_body(&parts.headers, &bytes),
    });
    tracing::debug!(request_id = %id, method = %parts.method, path = %parts.uri.path(), "Request");

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer response body");
            Bytes::new()
        }
    };

    let duration = start.elapsed().as_secs_f64();
    debug.history.complete(
        &id,
        ResponseRecord {
            status_code: parts.status.as_u16(),
            headers: header_map(&parts.headers),
            duration,
            body: json_body(&parts.headers, &bytes),
        },
    );
    tracing::debug!(request_id = %id, status = parts.status.as_u16(), duration_secs = duration, "Response");

    Response::from_parts(parts, Body::from(bytes))
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Parse the body when the content type says it is JSON
fn json_body(headers: &HeaderMap, bytes: &Bytes) -> Option<Value> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if !is_json {
        return None;
    }

    Some(
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String("(invalid JSON)".to_string())),
    )
}

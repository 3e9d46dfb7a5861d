// Integration tests for the MCP gateway

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{config, SpyExecutor};
use kali_mcp::client::DispatchClient;
use kali_mcp::server::{ApiServer, GatewayServer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const HEALTHY: &str = r#"{"status":"healthy","all_essential_tools_available":true}"#;

fn gateway(api_url: &str) -> Router {
    let client =
        DispatchClient::new(api_url, Duration::from_secs(2), Duration::from_secs(5)).unwrap();
    let server = GatewayServer::new(&config(false), client).unwrap();
    Arc::new(server).router()
}

fn invoke(tool: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/mcp/tools/kali_tools/{}", tool))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_relays_result_unchanged() {
    let mut api = mockito::Server::new_async().await;
    let results = json!({
        "stdout": "PORT   STATE SERVICE\n22/tcp open  ssh \u{1b}[0m\n",
        "stderr": "",
        "return_code": 0,
        "success": true
    });

    api.mock("GET", "/health")
        .with_status(200)
        .with_body(HEALTHY)
        .create_async()
        .await;
    let tool = api
        .mock("POST", "/api/tools/nmap")
        .match_body(mockito::Matcher::Exact(r#"{"target":"10.10.10.10","extra":1}"#.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(results.to_string())
        .create_async()
        .await;

    let (status, body) = send(
        gateway(&api.url()),
        invoke("nmap", r#"{"target":"10.10.10.10","extra":1}"#),
    )
    .await;

    tool.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["tool"], "nmap");
    assert_eq!(body["results"], results);
}

#[tokio::test]
async fn test_unhealthy_upstream_is_not_called() {
    let mut api = mockito::Server::new_async().await;
    api.mock("GET", "/health")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    let tool = api
        .mock("POST", "/api/tools/nmap")
        .expect(0)
        .create_async()
        .await;

    let (status, body) = send(gateway(&api.url()), invoke("nmap", r#"{"target":"10.10.10.10"}"#)).await;

    tool.assert_async().await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "API server health check failed: 500");
    assert_eq!(body["details"], "boom");
}

#[tokio::test]
async fn test_unreachable_upstream() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let (status, body) = send(gateway(&url), invoke("nmap", r#"{"target":"10.10.10.10"}"#)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("API server is not responding"));
}

#[tokio::test]
async fn test_unknown_tool_skips_upstream() {
    let mut api = mockito::Server::new_async().await;
    let health = api.mock("GET", "/health").expect(0).create_async().await;

    let (status, body) = send(gateway(&api.url()), invoke("masscan", "{}")).await;

    health.assert_async().await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unknown tool: masscan");
}

#[tokio::test]
async fn test_upstream_rejection_keeps_status() {
    let mut api = mockito::Server::new_async().await;
    api.mock("GET", "/health")
        .with_status(200)
        .with_body(HEALTHY)
        .create_async()
        .await;
    api.mock("POST", "/api/tools/nmap")
        .with_status(400)
        .with_body(r#"{"error":"target parameter is required","field":"target"}"#)
        .create_async()
        .await;

    let (status, body) = send(gateway(&api.url()), invoke("nmap", "{}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], 400);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("target parameter is required"));
}

#[tokio::test]
async fn test_malformed_upstream_body() {
    let mut api = mockito::Server::new_async().await;
    api.mock("GET", "/health")
        .with_status(200)
        .with_body(HEALTHY)
        .create_async()
        .await;
    api.mock("POST", "/api/tools/dirb")
        .with_status(200)
        .with_body("<html>proxy error</html>")
        .create_async()
        .await;

    let (status, body) = send(gateway(&api.url()), invoke("dirb", r#"{"url":"http://x"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["raw_response"], "<html>proxy error</html>");
}

#[tokio::test]
async fn test_capabilities_list_every_tool() {
    let request = Request::builder()
        .uri("/mcp/capabilities")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(gateway("http://127.0.0.1:1"), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server_name"], "Kali Linux Tools MCP Server");
    let capability = &body["capabilities"][0];
    assert_eq!(capability["name"], "kali_tools");
    assert_eq!(capability["actions"].as_array().unwrap().len(), 10);
    assert_eq!(capability["actions"][0], "nmap");
    assert_eq!(capability["tools"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_health_reports_upstream_state() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(gateway("http://127.0.0.1:1"), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["api_server"]["status"], "unhealthy");
    assert_eq!(body["api_server"]["url"], "http://127.0.0.1:1");
}

#[tokio::test]
async fn test_round_trip_through_both_servers() {
    let executor = Arc::new(SpyExecutor::with_stdout("Starting Nmap\n22/tcp open ssh\n"));

    let api = ApiServer::new(&config(false), executor.clone()).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(api.serve_on(listener, std::future::pending()));

    let (status, body) = send(
        gateway(&api_url),
        invoke("nmap", r#"{"target":"10.10.10.10","ports":"22"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{:?}", body);
    assert_eq!(body["results"]["stdout"], "Starting Nmap\n22/tcp open ssh\n");
    assert_eq!(body["results"]["return_code"], 0);

    // Health probes run `which` for the essential tools first
    let commands = executor.commands();
    assert_eq!(commands.last().unwrap(), "nmap -sV -p 22 10.10.10.10");
    assert!(commands.iter().any(|c| c == "which nmap"));
}

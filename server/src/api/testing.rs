//! Router harness for HTTP tests

use std::net::SocketAddr;

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use crate::core::CoreApp;
use crate::core::config::AppConfig;

pub const ALICE: &str = "6f1c2b9e-4b8a-4f5e-9d3c-2a1b0c9d8e7f";
pub const BOB: &str = "0d7e3a52-91c4-4c1e-8f0b-5b6a7c8d9e01";

/// Router over an in-memory app with admission control disabled
pub async fn test_router() -> Router {
    let mut config = AppConfig::defaults();
    config.rate_limit.enabled = false;
    test_router_with(config).await
}

pub async fn test_router_with(config: AppConfig) -> Router {
    let app = CoreApp::for_test(config).await;
    super::router(&app).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
}

/// Send one request; the body is parsed as JSON (`Null` when empty)
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    send_with_headers(router, method, uri, body, &[]).await
}

pub async fn send_with_headers(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

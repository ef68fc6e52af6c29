#![allow(dead_code)]

pub mod library;

use axum::Router;
use axum::body::Body;
use axum::http::{self, Method, StatusCode};
use axum_boot::{BootConfig, BootContext, BootContextBuilder, ConfigService};
use std::time::Duration;
use tower::ServiceExt;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Builder with short injection timeouts and no environment.
pub fn context(scan: bool) -> BootContextBuilder {
    init_tracing();
    BootContext::builder()
        .config(BootConfig {
            scan,
            inject_timeout: Duration::from_secs(2),
            inject_retry_step: Duration::from_millis(5),
        })
        .config_service(ConfigService::default())
}

pub fn request(method: Method, uri: &str) -> http::Request<Body> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: http::Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

use crate::middleware::{Middleware, Next};
use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use std::time::Instant;

/// A middleware that logs request timing and status
#[derive(Clone, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn dispatch(&self, request: Request, next: Next) -> Response {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let start = Instant::now();

        tracing::info!(%method, %uri, "-->");
        let response = next.run(request).await;
        tracing::info!(
            %method,
            %uri,
            status = %response.status(),
            elapsed = ?start.elapsed(),
            "<--"
        );
        response
    }
}

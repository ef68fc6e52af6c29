mod layer;
mod logging;
mod record;
mod ws;

pub use layer::{ScopedMiddleware, ScopedMiddlewareLayer};
pub use logging::LoggingMiddleware;
pub use record::{ScopeSet, UseMiddlewareRecord};
pub use ws::{ScopedSocket, WsChain, WsEvent, WsFnMiddleware, WsMiddleware, WsNext, from_ws_fn};

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Represents the next handler in the chain
pub struct Next {
    run: Box<dyn FnOnce(Request) -> BoxFuture<'static, Response> + Send>,
}

impl Next {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the next handler
    pub async fn run(self, request: Request) -> Response {
        (self.run)(request).await
    }
}

/// HTTP middleware applied to the direct endpoints of a scope.
///
/// # Example
/// ```
/// use axum_boot::middleware::{Middleware, Next};
/// use axum_boot::prelude::*;
/// use axum::extract::Request;
///
/// struct Timing;
///
/// #[async_trait]
/// impl Middleware for Timing {
///     async fn dispatch(&self, request: Request, next: Next) -> Response {
///         let start = std::time::Instant::now();
///         let response = next.run(request).await;
///         tracing::info!(elapsed = ?start.elapsed(), "request done");
///         response
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn dispatch(&self, request: Request, next: Next) -> Response;
}

/// Middleware backed by an async function.
pub struct FnMiddleware<F>(F);

pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FnMiddleware(f)
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn dispatch(&self, request: Request, next: Next) -> Response {
        (self.0)(request, next).await
    }
}

/// Wraps `endpoint` in `chain`. Later entries wrap earlier ones, so the last declared
/// middleware runs first.
pub(crate) fn compose(chain: &[Arc<dyn Middleware>], endpoint: Next) -> Next {
    chain.iter().fold(endpoint, |next, middleware| {
        let middleware = Arc::clone(middleware);
        Next::new(move |request| Box::pin(async move { middleware.dispatch(request, next).await }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::response::IntoResponse;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Arc<dyn Middleware> {
        let log = Arc::clone(log);
        Arc::new(from_fn(move |request: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name}-pre"));
                let response = next.run(request).await;
                log.lock().unwrap().push(format!("{name}-post"));
                response
            }
        }))
    }

    #[tokio::test]
    async fn last_declared_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![recorder(&log, "A"), recorder(&log, "B")];
        let handler_log = Arc::clone(&log);
        let endpoint = Next::new(move |_| {
            Box::pin(async move {
                handler_log.lock().unwrap().push("handler".to_string());
                "ok".into_response()
            })
        });

        compose(&chain, endpoint)
            .run(Request::new(Body::empty()))
            .await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["B-pre", "A-pre", "handler", "A-post", "B-post"]
        );
    }
}

use crate::middleware::{Middleware, Next, ScopeSet, compose};
use axum::extract::{MatchedPath, Request};
use axum::response::Response;
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer running a middleware chain for the `(path, method)` pairs of one scope.
/// Other requests go straight to the route.
#[derive(Clone)]
pub struct ScopedMiddlewareLayer {
    chain: Arc<[Arc<dyn Middleware>]>,
    scope: Arc<ScopeSet>,
}

impl ScopedMiddlewareLayer {
    pub fn new(chain: Vec<Arc<dyn Middleware>>, scope: ScopeSet) -> Self {
        Self {
            chain: chain.into(),
            scope: Arc::new(scope),
        }
    }
}

impl<S> Layer<S> for ScopedMiddlewareLayer {
    type Service = ScopedMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ScopedMiddleware {
            inner,
            chain: Arc::clone(&self.chain),
            scope: Arc::clone(&self.scope),
        }
    }
}

#[derive(Clone)]
pub struct ScopedMiddleware<S> {
    inner: S,
    chain: Arc<[Arc<dyn Middleware>]>,
    scope: Arc<ScopeSet>,
}

impl<S> ScopedMiddleware<S> {
    fn in_scope(&self, request: &Request) -> bool {
        request
            .extensions()
            .get::<MatchedPath>()
            .is_some_and(|path| self.scope.contains(path.as_str(), request.method()))
    }
}

impl<S> Service<Request> for ScopedMiddleware<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The polled service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if !self.in_scope(&request) {
            return Box::pin(inner.call(request));
        }

        let chain = Arc::clone(&self.chain);
        Box::pin(async move {
            let endpoint = Next::new(move |request| {
                Box::pin(async move {
                    match inner.call(request).await {
                        Ok(response) => response,
                        Err(never) => match never {},
                    }
                })
            });
            Ok(compose(&chain, endpoint).run(request).await)
        })
    }
}

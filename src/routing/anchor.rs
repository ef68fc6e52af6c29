use crate::error::{BootError, Result};
use crate::routing::path::{join_path, strip_prefix};
use crate::routing::RouteKind;
use axum::extract::Request;
use axum::http::Method;
use axum::response::Response;
use axum::routing::{MethodFilter, on};
use axum::Router;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;

pub(crate) type RequestHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// The router a controller mounts into, attached to the application under the
/// controller prefix. Each `(path, method)` is mounted at most once.
pub(crate) struct Anchor {
    prefix: String,
    router: Router,
    keys: HashSet<(String, Method)>,
}

impl Anchor {
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            prefix: join_path([prefix]),
            router: Router::new(),
            keys: HashSet::new(),
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn relative(&self, full_path: &str) -> String {
        strip_prefix(full_path, &self.prefix)
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// Mounts `handler` at `full_path`; returns how many methods were new.
    pub(crate) fn mount(
        &mut self,
        full_path: &str,
        kind: &RouteKind,
        handler: RequestHandler,
    ) -> Result<usize> {
        let path = self.relative(full_path);
        let mut filter: Option<MethodFilter> = None;
        let mut fresh = Vec::new();
        for method in kind.methods() {
            if fresh.contains(&method) {
                continue;
            }
            if self.keys.contains(&(path.clone(), method.clone())) {
                tracing::warn!(path = full_path, %method, "route already mounted, skipping");
                continue;
            }
            let single = MethodFilter::try_from(method.clone()).map_err(|_| {
                BootError::UnsupportedMethod {
                    method: method.to_string(),
                }
            })?;
            filter = Some(filter.map_or(single, |f| f.or(single)));
            fresh.push(method);
        }

        let Some(filter) = filter else {
            return Ok(0);
        };
        tracing::debug!(path = full_path, methods = ?fresh, "mounting route");

        let added = fresh.len();
        self.keys
            .extend(fresh.into_iter().map(|method| (path.clone(), method)));
        self.router = std::mem::take(&mut self.router).route(
            &path,
            on(filter, move |request: Request| {
                let handler = Arc::clone(&handler);
                async move { handler(request).await }
            }),
        );
        Ok(added)
    }

    pub(crate) fn attach(self, app: Router) -> Router {
        if self.keys.is_empty() {
            app
        } else if self.prefix.is_empty() {
            app.merge(self.router)
        } else {
            app.nest(&self.prefix, self.router)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{self, StatusCode};
    use axum::response::IntoResponse;
    use tower::ServiceExt;

    fn ok() -> RequestHandler {
        Arc::new(|_: Request| -> BoxFuture<'static, Response> {
            Box::pin(async { StatusCode::OK.into_response() })
        })
    }

    #[test]
    fn duplicate_routes_are_skipped() {
        let mut anchor = Anchor::new("/book/");
        assert_eq!(anchor.prefix(), "/book");
        let kind = RouteKind::Http(vec![Method::GET, Method::POST]);
        assert_eq!(anchor.mount("/book/{name}", &kind, ok()).unwrap(), 2);
        assert_eq!(anchor.mount("/book/{name}", &kind, ok()).unwrap(), 0);
        let put = RouteKind::Http(vec![Method::GET, Method::PUT]);
        assert_eq!(anchor.mount("/book/{name}", &put, ok()).unwrap(), 1);
        assert_eq!(anchor.len(), 3);
    }

    #[test]
    fn unknown_methods_are_rejected() {
        let mut anchor = Anchor::new("");
        let kind = RouteKind::Http(vec![Method::from_bytes(b"BREW").unwrap()]);
        let err = anchor.mount("/coffee", &kind, ok()).unwrap_err();
        assert!(matches!(err, BootError::UnsupportedMethod { .. }));
    }

    #[tokio::test]
    async fn root_of_prefix_is_reachable() {
        let mut anchor = Anchor::new("/book");
        anchor
            .mount("/book", &RouteKind::Http(vec![]), ok())
            .unwrap();
        let app = anchor.attach(Router::new());

        let response = app
            .oneshot(http::Request::builder().uri("/book").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

use crate::middleware::{Middleware, ScopedMiddlewareLayer, WsChain, WsMiddleware};
use axum::Router;
use axum::http::Method;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Add;
use std::sync::Arc;

/// `(path, method)` pairs a middleware chain applies to. Paths are route templates as
/// reported by `MatchedPath`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeSet {
    routes: HashMap<String, HashSet<Method>>,
}

impl ScopeSet {
    pub fn insert(&mut self, path: &str, methods: impl IntoIterator<Item = Method>) {
        self.routes
            .entry(path.to_string())
            .or_default()
            .extend(methods);
    }

    /// `HEAD` is answered by `GET` routes, so it is in scope wherever `GET` is.
    pub fn contains(&self, path: &str, method: &Method) -> bool {
        self.routes.get(path).is_some_and(|methods| {
            methods.contains(method) || (*method == Method::HEAD && methods.contains(&Method::GET))
        })
    }

    pub fn union(mut self, other: ScopeSet) -> Self {
        for (path, methods) in other.routes {
            self.routes.entry(path).or_default().extend(methods);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(HashSet::len).sum()
    }
}

/// Middleware declared on a scope.
///
/// Records added together keep declaration order: `a + b` runs `b` outside `a`.
#[derive(Clone, Default)]
pub struct UseMiddlewareRecord {
    http: Vec<Arc<dyn Middleware>>,
    ws: Vec<Arc<dyn WsMiddleware>>,
    ws_only_message: bool,
    http_scope: ScopeSet,
}

impl UseMiddlewareRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn http(middleware: impl Middleware) -> Self {
        Self::new().dispatch(middleware)
    }

    /// WebSocket middleware; with `only_message` it sees data messages only, otherwise
    /// the connect and close events as well.
    pub fn ws(middleware: impl WsMiddleware, only_message: bool) -> Self {
        Self::new().ws_dispatch(middleware).only_message(only_message)
    }

    pub fn dispatch(mut self, middleware: impl Middleware) -> Self {
        self.http.push(Arc::new(middleware));
        self
    }

    pub fn ws_dispatch(mut self, middleware: impl WsMiddleware) -> Self {
        self.ws.push(Arc::new(middleware));
        self
    }

    pub fn only_message(mut self, only_message: bool) -> Self {
        self.ws_only_message = only_message;
        self
    }

    pub fn http_scope(&self) -> &ScopeSet {
        &self.http_scope
    }

    pub(crate) fn record_http(&mut self, path: &str, methods: impl IntoIterator<Item = Method>) {
        self.http_scope.insert(path, methods);
    }

    pub fn ws_chain(&self) -> WsChain {
        WsChain::new(self.ws.clone(), self.ws_only_message)
    }

    /// Adds one scoped layer running every HTTP dispatch of this record.
    pub fn add_http_middleware(self, app: Router) -> Router {
        if self.http.is_empty() || self.http_scope.is_empty() {
            return app;
        }
        tracing::debug!(
            middleware = self.http.len(),
            routes = self.http_scope.len(),
            "adding scoped http middleware"
        );
        app.layer(ScopedMiddlewareLayer::new(self.http, self.http_scope))
    }
}

impl Add for UseMiddlewareRecord {
    type Output = UseMiddlewareRecord;

    fn add(mut self, rhs: UseMiddlewareRecord) -> Self::Output {
        self.http.extend(rhs.http);
        self.ws.extend(rhs.ws);
        self.ws_only_message |= rhs.ws_only_message;
        self.http_scope = self.http_scope.union(rhs.http_scope);
        self
    }
}

impl fmt::Debug for UseMiddlewareRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseMiddlewareRecord")
            .field("http", &self.http.len())
            .field("ws", &self.ws.len())
            .field("ws_only_message", &self.ws_only_message)
            .field("http_scope", &self.http_scope)
            .finish()
    }
}

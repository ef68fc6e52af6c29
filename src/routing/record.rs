use crate::di::{Injectable, TypeKey};
use crate::error::Result;
use crate::middleware::{Middleware, ScopedSocket, UseMiddlewareRecord, WsMiddleware};
use crate::routing::path::{join_path, route_path};
use crate::routing::resolver::RouteResolver;
use crate::routing::this::{Splice, This};
use crate::routing::UseDep;
use axum::extract::{FromRequestParts, Request, WebSocketUpgrade};
use axum::handler::Handler;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) type ErasedHandler = Arc<dyn Fn(Request, Splice) -> BoxFuture<'static, Response> + Send + Sync>;

/// Identity under which attachment tasks are keyed: the controller or handler type plus
/// a fingerprint of what it declares (normalized paths, method sets, nested scopes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    ty: TypeKey,
    shape: u64,
}

impl ScopeId {
    pub(crate) fn new(ty: TypeKey, shape: u64) -> Self {
        Self { ty, shape }
    }

    pub fn type_key(&self) -> TypeKey {
        self.ty
    }

    pub fn name(&self) -> &'static str {
        self.ty.name()
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:016x}", self.ty.name(), self.shape)
    }
}

fn fingerprint(feed: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    feed(&mut hasher);
    hasher.finish()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteKind {
    Http(Vec<Method>),
    WebSocket,
}

impl RouteKind {
    /// Methods the route answers to; an empty set means `GET`, as does a WebSocket upgrade.
    pub fn methods(&self) -> Vec<Method> {
        match self {
            RouteKind::Http(methods) if !methods.is_empty() => methods.clone(),
            _ => vec![Method::GET],
        }
    }

    /// Order-insensitive, duplicate-free view of the kind.
    fn shape(&self, state: &mut DefaultHasher) {
        match self {
            RouteKind::WebSocket => "websocket".hash(state),
            RouteKind::Http(_) => {
                let mut names: Vec<String> =
                    self.methods().iter().map(|m| m.as_str().to_string()).collect();
                names.sort();
                names.dedup();
                names.hash(state);
            }
        }
    }
}

/// A single endpoint: path, method set and handler.
pub struct Endpoint {
    path: String,
    kind: RouteKind,
    handler: ErasedHandler,
    response: Option<&'static str>,
    handler_type: TypeKey,
}

macro_rules! verb {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            pub fn $name<H, T>(path: impl Into<String>, handler: H) -> Self
            where
                H: Handler<T, ()>,
                T: 'static,
            {
                Self::route([Method::$method], path, handler)
            }
        )*
    };
}

impl Endpoint {
    pub fn route<H, T>(
        methods: impl IntoIterator<Item = Method>,
        path: impl Into<String>,
        handler: H,
    ) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let erased: ErasedHandler = Arc::new(
            move |mut request: Request, splice: Splice| -> BoxFuture<'static, Response> {
                request.extensions_mut().insert(splice);
                Box::pin(handler.clone().call(request, ()))
            },
        );
        Self {
            path: path.into(),
            kind: RouteKind::Http(methods.into_iter().collect()),
            handler: erased,
            response: None,
            handler_type: TypeKey::of::<H>(),
        }
    }

    verb! {
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        head => HEAD,
        options => OPTIONS,
        trace => TRACE,
    }

    /// WebSocket endpoint. The socket has the scope's WebSocket middleware applied.
    pub fn websocket<C, F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(This<C>, ScopedSocket) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let erased: ErasedHandler = Arc::new(
            move |request: Request, splice: Splice| -> BoxFuture<'static, Response> {
                let handler = handler.clone();
                Box::pin(async move {
                    let (mut parts, _body) = request.into_parts();
                    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
                        Ok(upgrade) => upgrade,
                        Err(rejection) => return rejection.into_response(),
                    };
                    let this = match This::<C>::from_splice(&splice) {
                        Ok(this) => this,
                        Err(err) => return err.into_response(),
                    };
                    upgrade.on_upgrade(move |socket| async move {
                        match ScopedSocket::accept(socket, splice.ws).await {
                            Some(socket) => handler(this, socket).await,
                            None => tracing::debug!("websocket refused by middleware"),
                        }
                    })
                })
            },
        );
        Self {
            path: path.into(),
            kind: RouteKind::WebSocket,
            handler: erased,
            response: None,
            handler_type: TypeKey::of::<F>(),
        }
    }

    /// Records the response type for diagnostics.
    pub fn response<R: ?Sized + 'static>(mut self) -> Self {
        self.response = Some(std::any::type_name::<R>());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &RouteKind {
        &self.kind
    }

    pub fn response_type(&self) -> Option<&'static str> {
        self.response
    }

    /// Handler type, normalized path and method set. The same handler mounted at another
    /// path or for other methods is another endpoint.
    pub fn id(&self) -> ScopeId {
        ScopeId::new(self.handler_type, fingerprint(|state| self.shape(state)))
    }

    fn shape(&self, state: &mut DefaultHasher) {
        self.handler_type.hash(state);
        route_path([self.path.as_str()]).hash(state);
        self.kind.shape(state);
    }

    pub(crate) fn handler(&self) -> ErasedHandler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("response", &self.response)
            .finish()
    }
}

pub(crate) enum RouteRecord {
    Endpoint(Endpoint),
    Prefix(Box<dyn ScopeDecl>),
}

/// Object-safe view of a [`Scope`] so nested scopes of different types can be walked.
pub(crate) trait ScopeDecl: Send {
    fn resolve(self: Box<Self>, resolver: &mut RouteResolver<'_>, parent_prefix: &str) -> Result<()>;

    fn shape(&self, state: &mut DefaultHasher);
}

/// A declarative scope: a path prefix grouping endpoints, nested scopes,
/// use-dependencies and middleware around an instance of `C`.
///
/// ```
/// use axum_boot::prelude::*;
///
/// #[derive(Injectable)]
/// struct BookController;
///
/// async fn remove(Path(name): Path<String>) -> String {
///     format!("removed {name}")
/// }
///
/// let books = Controller::<BookController>::new("/book")
///     .nest(Prefix::<()>::new("").delete("/{name}", remove));
/// ```
pub struct Scope<C> {
    prefix: String,
    routes: Vec<RouteRecord>,
    use_deps: Vec<(&'static str, UseDep)>,
    middleware: Vec<UseMiddlewareRecord>,
    _instance: PhantomData<fn() -> C>,
}

/// Top of a route tree; owns the attachment identity.
pub type Controller<C> = Scope<C>;

/// Nested scope, attached under its controller's identity.
pub type Prefix<C> = Scope<C>;

macro_rules! scope_verb {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name<H, T>(self, path: impl Into<String>, handler: H) -> Self
            where
                H: Handler<T, ()>,
                T: 'static,
            {
                self.endpoint(Endpoint::$name(path, handler))
            }
        )*
    };
}

impl<C: Injectable> Scope<C> {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            routes: Vec::new(),
            use_deps: Vec::new(),
            middleware: Vec::new(),
            _instance: PhantomData,
        }
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.routes.push(RouteRecord::Endpoint(endpoint));
        self
    }

    pub fn route<H, T>(
        self,
        methods: impl IntoIterator<Item = Method>,
        path: impl Into<String>,
        handler: H,
    ) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.endpoint(Endpoint::route(methods, path, handler))
    }

    scope_verb!(get, post, put, delete, patch, head, options, trace);

    pub fn websocket<F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(This<C>, ScopedSocket) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.endpoint(Endpoint::websocket::<C, F, Fut>(path, handler))
    }

    pub fn nest<D: Injectable>(mut self, scope: Scope<D>) -> Self {
        self.routes.push(RouteRecord::Prefix(Box::new(scope)));
        self
    }

    /// Adds a use-dependency reachable as `this.dep(attr)` from every direct endpoint.
    /// Re-declaring `attr` replaces the earlier marker.
    pub fn use_dep(mut self, attr: &'static str, marker: UseDep) -> Self {
        self.use_deps.retain(|(existing, _)| *existing != attr);
        self.use_deps.push((attr, marker));
        self
    }

    pub fn use_middleware(mut self, record: UseMiddlewareRecord) -> Self {
        self.middleware.push(record);
        self
    }

    pub fn use_http_middleware(self, middleware: impl Middleware) -> Self {
        self.use_middleware(UseMiddlewareRecord::http(middleware))
    }

    pub fn use_ws_middleware(self, middleware: impl WsMiddleware, only_message: bool) -> Self {
        self.use_middleware(UseMiddlewareRecord::ws(middleware, only_message))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Controller type plus the shape of the whole tree. Declaring an identical tree again
    /// yields the same id.
    pub fn id(&self) -> ScopeId {
        ScopeId::new(TypeKey::of::<C>(), fingerprint(|state| self.tree_shape(state)))
    }

    fn tree_shape(&self, state: &mut DefaultHasher) {
        TypeKey::of::<C>().hash(state);
        join_path([self.prefix.as_str()]).hash(state);
        for record in &self.routes {
            match record {
                RouteRecord::Endpoint(endpoint) => {
                    0u8.hash(state);
                    endpoint.shape(state);
                }
                RouteRecord::Prefix(nested) => {
                    1u8.hash(state);
                    nested.shape(state);
                }
            }
        }
        self.routes.len().hash(state);
        for (attr, dep) in &self.use_deps {
            attr.hash(state);
            dep.type_key().hash(state);
        }
        self.middleware.len().hash(state);
    }

    pub(crate) fn into_parts(self) -> ScopeParts {
        ScopeParts {
            prefix: self.prefix,
            routes: self.routes,
            use_deps: self.use_deps,
            middleware: self.middleware,
        }
    }
}

pub(crate) struct ScopeParts {
    pub(crate) prefix: String,
    pub(crate) routes: Vec<RouteRecord>,
    pub(crate) use_deps: Vec<(&'static str, UseDep)>,
    pub(crate) middleware: Vec<UseMiddlewareRecord>,
}

impl<C: Injectable> ScopeDecl for Scope<C> {
    fn resolve(self: Box<Self>, resolver: &mut RouteResolver<'_>, parent_prefix: &str) -> Result<()> {
        resolver.resolve_scope(*self, parent_prefix)
    }

    fn shape(&self, state: &mut DefaultHasher) {
        self.tree_shape(state)
    }
}

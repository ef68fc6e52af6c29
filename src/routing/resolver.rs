use crate::context::BootContext;
use crate::di::key::{Value, erase};
use crate::di::{Injectable, Injector, Param, Signature};
use crate::error::Result;
use crate::middleware::{UseMiddlewareRecord, WsChain};
use crate::routing::anchor::{Anchor, RequestHandler};
use crate::routing::app_task::AppTask;
use crate::routing::path::route_path;
use crate::routing::record::{ErasedHandler, RouteKind, RouteRecord, Scope, ScopeParts};
use crate::routing::this::Splice;
use crate::routing::{Endpoint, UseDep};
use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// Reserved prefix of the synthetic parameters added for use-dependencies.
pub const USE_DEP_PARAM_PREFIX: &str = "boot__use_dep_";

pub(crate) fn synthetic_param(attr: &str) -> String {
    format!("{USE_DEP_PARAM_PREFIX}{attr}")
}

/// Walks one controller tree, mounting every endpoint into a single anchor.
pub(crate) struct RouteResolver<'a> {
    injector: Injector<'a>,
    anchor: Anchor,
    middleware: Vec<AppTask>,
}

impl<'a> RouteResolver<'a> {
    pub(crate) fn new(injector: Injector<'a>, anchor: Anchor) -> Self {
        Self {
            injector,
            anchor,
            middleware: Vec::new(),
        }
    }

    /// Depth-first, pre-order: instance first, then direct endpoints and nested scopes in
    /// declaration order, then this level's middleware.
    pub(crate) fn resolve_scope<C: Injectable>(
        &mut self,
        scope: Scope<C>,
        parent_prefix: &str,
    ) -> Result<()> {
        let ScopeParts {
            prefix,
            routes,
            use_deps,
            middleware,
        } = scope.into_parts();

        let instance = Arc::new(self.injector.create::<C>()?);
        let scope_prefix = route_path([parent_prefix, prefix.as_str()]);
        let mut composed = middleware.into_iter().reduce(|a, b| a + b);
        let ws = composed
            .as_ref()
            .map(UseMiddlewareRecord::ws_chain)
            .unwrap_or_default();
        let plan = SplicePlan {
            instance: erase(instance),
            use_deps: Arc::new(use_deps),
            ws,
        };

        for record in routes {
            match record {
                RouteRecord::Endpoint(endpoint) => {
                    let full_path = route_path([scope_prefix.as_str(), endpoint.path()]);
                    if let (Some(record), RouteKind::Http(_)) = (composed.as_mut(), endpoint.kind())
                    {
                        record.record_http(&full_path, endpoint.kind().methods());
                    }
                    tracing::debug!(
                        signature = ?plan.signature(&endpoint),
                        path = %full_path,
                        "endpoint resolved"
                    );
                    let handler = plan.wrap(endpoint.handler());
                    self.anchor.mount(&full_path, endpoint.kind(), handler)?;
                }
                RouteRecord::Prefix(nested) => nested.resolve(self, &scope_prefix)?,
            }
        }

        if let Some(record) = composed {
            self.middleware
                .push(Box::new(move |app| record.add_http_middleware(app)));
        }
        Ok(())
    }
}

/// Per-scope data spliced into every request of its direct endpoints.
struct SplicePlan {
    instance: Value,
    use_deps: Arc<Vec<(&'static str, UseDep)>>,
    ws: WsChain,
}

impl SplicePlan {
    /// Descriptor of the synthetic keyword-only parameters an endpoint receives.
    fn signature(&self, endpoint: &Endpoint) -> Signature {
        self.use_deps.iter().fold(
            Signature::new(endpoint.path().to_string()),
            |signature, (attr, dep)| {
                signature.param(Param::annotated(synthetic_param(attr), dep.type_key()).keyword_only())
            },
        )
    }

    /// Resolves the synthetic parameters, then hands the request to the endpoint.
    /// A rejected use-dependency short-circuits with its rejection.
    fn wrap(&self, handler: ErasedHandler) -> RequestHandler {
        let instance = Arc::clone(&self.instance);
        let use_deps = Arc::clone(&self.use_deps);
        let ws = self.ws.clone();
        Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
            let instance = Arc::clone(&instance);
            let use_deps = Arc::clone(&use_deps);
            let ws = ws.clone();
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let (mut parts, body) = request.into_parts();
                let mut params = HashMap::with_capacity(use_deps.len());
                for (attr, dep) in use_deps.iter() {
                    match dep.resolve(&mut parts).await {
                        Ok(value) => {
                            params.insert(synthetic_param(attr), value);
                        }
                        Err(rejection) => return rejection,
                    }
                }
                let splice = Splice {
                    instance,
                    params: Arc::new(params),
                    ws,
                };
                handler(Request::from_parts(parts, body), splice).await
            })
        })
    }
}

/// Resolves a controller tree and queues its attachment under the controller identity:
/// mounting first, then middleware in the order the levels were walked.
pub(crate) fn resolve_controller<C: Injectable>(ctx: &BootContext, scope: Scope<C>) -> Result<()> {
    let id = scope.id();
    let mut resolver = RouteResolver::new(ctx.injector(), Anchor::new(scope.prefix()));
    resolver.resolve_scope(scope, "")?;

    let RouteResolver {
        anchor, middleware, ..
    } = resolver;
    tracing::info!(
        controller = ?id,
        prefix = anchor.prefix(),
        routes = anchor.len(),
        "controller resolved"
    );
    ctx.app_tasks().add(id, Box::new(move |app| anchor.attach(app)));
    for task in middleware {
        ctx.app_tasks().add(id, task);
    }
    Ok(())
}

/// Mounts a top-level function view; it has no instance and no use-dependencies.
pub(crate) fn resolve_endpoint(ctx: &BootContext, endpoint: Endpoint) -> Result<()> {
    let id = endpoint.id();
    let plan = SplicePlan {
        instance: erase(Arc::new(())),
        use_deps: Arc::new(Vec::new()),
        ws: WsChain::default(),
    };
    let mut anchor = Anchor::new("");
    let full_path = route_path([endpoint.path()]);
    anchor.mount(&full_path, endpoint.kind(), plan.wrap(endpoint.handler()))?;
    ctx.app_tasks().add(id, Box::new(move |app| anchor.attach(app)));
    Ok(())
}

//! Application Bootstrap
//!
//! Drains the deferred registrations of a [`BootContext`] and attaches every resolved
//! controller to an axum [`Router`].

use crate::context::BootContext;
use crate::error::Result;
use crate::routing::ScopeId;
use axum::{Extension, Router};
use std::sync::Arc;

/// Finalizes `ctx` and returns `app` (or a fresh router) with the listed controllers
/// attached, in the listed order.
///
/// With scanning enabled every other declared controller is attached too, in declaration
/// order. With scanning disabled only the listed ones are. App-ready callbacks then see the
/// attached router, and the exception handler layer wraps every route.
pub fn provide_app(ctx: &BootContext, app: Option<Router>, controllers: &[ScopeId]) -> Result<Router> {
    ctx.finalize()?;

    let mut app = app.unwrap_or_default();
    for id in controllers {
        let (next, emitted) = ctx.app_tasks().emit(*id, app);
        if emitted == 0 {
            tracing::warn!(controller = ?id, "nothing to attach for controller");
        }
        app = next;
    }

    let pending = ctx.app_tasks().pending();
    if ctx.config().scan {
        for id in pending {
            app = ctx.app_tasks().emit(id, app).0;
        }
    } else if !pending.is_empty() {
        tracing::warn!(
            controllers = ?pending,
            "declared controllers were not listed and stay detached"
        );
    }

    let app = ctx.ready(app);
    tracing::info!("application ready");
    Ok(app.layer(Extension(ctx.dependencies())))
}

/// A bootstrapped application: the router plus the context it was built from.
///
/// # Example
///
/// ```rust,no_run
/// use axum_boot::prelude::*;
///
/// #[derive(Injectable)]
/// struct HealthController;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let ctx = BootContext::new();
///     ctx.controller(Controller::<HealthController>::new("/health").get("", || async { "ok" }))?;
///
///     let app = Application::builder().context(ctx).build()?;
///     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
///     axum::serve(listener, app.into_router()).await.unwrap();
///     Ok(())
/// }
/// ```
pub struct Application {
    context: Arc<BootContext>,
    router: Router,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn context(&self) -> &Arc<BootContext> {
        &self.context
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Builder for Application
#[derive(Default)]
pub struct ApplicationBuilder {
    context: Option<BootContext>,
    router: Option<Router>,
    controllers: Vec<ScopeId>,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(mut self, context: BootContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Start from an existing router instead of an empty one.
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Controllers to attach first; required when scanning is disabled.
    pub fn controller(mut self, id: ScopeId) -> Self {
        self.controllers.push(id);
        self
    }

    pub fn controllers(mut self, ids: impl IntoIterator<Item = ScopeId>) -> Self {
        self.controllers.extend(ids);
        self
    }

    /// Build the application
    ///
    /// # Errors
    ///
    /// Returns the first failure of the deferred registrations.
    pub fn build(self) -> Result<Application> {
        let context = self.context.unwrap_or_default();
        tracing::info!("Starting application initialization...");
        let router = provide_app(&context, self.router, &self.controllers)?;
        Ok(Application {
            context: Arc::new(context),
            router,
        })
    }
}

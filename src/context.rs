use crate::config::{BootConfig, ConfigService};
use crate::di::key::erase;
use crate::di::{
    Bean, Dependencies, DependencyKey, DependencyStore, Injectable, Injector, Origin,
    SignatureCache, Task, TaskStore, Value,
};
use crate::error::{BootError, Result};
use crate::exception::ExceptionHandlers;
use crate::routing::{
    AppTask, AppTaskStore, Declaration, Endpoint, Scope, ScopeId, resolve_controller, resolve_endpoint,
};
use axum::Router;
use axum::response::IntoResponse;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Process-wide bootstrap state, passed explicitly instead of living in globals.
///
/// Declarations (`injectable`, `bean`, `controller`, ...) only schedule work; nothing is
/// constructed until [`BootContext::finalize`] drains the queues.
pub struct BootContext {
    store: Arc<DependencyStore>,
    tasks: TaskStore,
    app_tasks: AppTaskStore,
    signatures: SignatureCache,
    exception_handlers: ExceptionHandlers,
    app_ready: Mutex<Vec<AppTask>>,
    config: BootConfig,
    config_service: ConfigService,
}

/// Builder for [`BootContext`]
#[derive(Default)]
pub struct BootContextBuilder {
    config: Option<BootConfig>,
    config_service: Option<ConfigService>,
    instances: Vec<(DependencyKey, Value)>,
}

impl BootContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the knobs otherwise read from the config service.
    pub fn config(mut self, config: BootConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_service(mut self, config_service: ConfigService) -> Self {
        self.config_service = Some(config_service);
        self
    }

    /// Register a ready-made instance.
    pub fn register<T: Send + Sync + 'static>(self, instance: T) -> Self {
        self.register_arc::<T>(None, Arc::new(instance))
    }

    pub fn register_named<T: Send + Sync + 'static>(self, name: &str, instance: T) -> Self {
        self.register_arc::<T>(Some(name), Arc::new(instance))
    }

    pub fn register_arc<T: ?Sized + Send + Sync + 'static>(
        mut self,
        name: Option<&str>,
        instance: Arc<T>,
    ) -> Self {
        self.instances
            .push((DependencyKey::of::<T>(name), erase(instance)));
        self
    }

    pub fn build(self) -> Result<BootContext> {
        let config_service = self.config_service.unwrap_or_else(ConfigService::from_env);
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => BootConfig::from_config(&config_service)?,
        };

        let ctx = BootContext::assemble(config, config_service);
        for (key, value) in self.instances {
            ctx.store.add_value(key, value);
        }
        Ok(ctx)
    }
}

impl BootContext {
    pub fn builder() -> BootContextBuilder {
        BootContextBuilder::new()
    }

    /// Context with default knobs and an empty config service.
    pub fn new() -> Self {
        Self::assemble(BootConfig::default(), ConfigService::default())
    }

    fn assemble(config: BootConfig, config_service: ConfigService) -> Self {
        let store = Arc::new(DependencyStore::new());
        store.add(None, Arc::new(config_service.clone()));
        Self {
            store,
            tasks: TaskStore::default(),
            app_tasks: AppTaskStore::default(),
            signatures: SignatureCache::default(),
            exception_handlers: ExceptionHandlers::default(),
            app_ready: Mutex::new(Vec::new()),
            config,
            config_service,
        }
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    pub fn config_service(&self) -> &ConfigService {
        &self.config_service
    }

    pub fn store(&self) -> &DependencyStore {
        &self.store
    }

    /// Shared handle installed into requests by the bootstrap.
    pub fn dependencies(&self) -> Dependencies {
        Dependencies(Arc::clone(&self.store))
    }

    pub fn injector(&self) -> Injector<'_> {
        Injector::new(&self.store, &self.config, &self.signatures)
    }

    /// Immediate registration, bypassing the task queues.
    pub fn register<T: ?Sized + Send + Sync + 'static>(&self, name: Option<&str>, instance: Arc<T>) {
        self.store.add(name, instance);
    }

    /// Schedules construction of `T` through constructor injection.
    #[track_caller]
    pub fn injectable<T: Injectable>(&self) -> Result<()> {
        self.schedule(Origin::caller(), collect_injectable::<T>(None))
    }

    #[track_caller]
    pub fn injectable_named<T: Injectable>(&self, name: &str) -> Result<()> {
        self.schedule(Origin::caller(), collect_injectable::<T>(Some(name.to_string())))
    }

    #[track_caller]
    pub fn bean<R: ?Sized + Send + Sync + 'static>(&self, bean: Bean<R>) -> Result<()> {
        self.schedule(Origin::caller(), bean.into_task())
    }

    /// Registers the instance of `Impl` under `Trait` as well.
    ///
    /// ```
    /// use axum_boot::prelude::*;
    ///
    /// trait Shelf: Send + Sync {}
    ///
    /// #[derive(Injectable)]
    /// struct MemoryShelf;
    ///
    /// impl Shelf for MemoryShelf {}
    ///
    /// let ctx = BootContext::new();
    /// ctx.injectable::<MemoryShelf>().unwrap();
    /// ctx.bind::<dyn Shelf, MemoryShelf>(|shelf| shelf as Arc<dyn Shelf>).unwrap();
    /// ctx.finalize().unwrap();
    /// assert!(ctx.lookup::<dyn Shelf>(None).is_some());
    /// ```
    #[track_caller]
    pub fn bind<Trait, Impl>(
        &self,
        cast: impl FnOnce(Arc<Impl>) -> Arc<Trait> + Send + 'static,
    ) -> Result<()>
    where
        Trait: ?Sized + Send + Sync + 'static,
        Impl: Send + Sync + 'static,
    {
        self.schedule(
            Origin::caller(),
            Box::new(move |ctx: &BootContext| {
                let instance = ctx.injector().inject::<Impl>(None)?;
                ctx.store().add::<Trait>(None, cast(instance));
                Ok(())
            }),
        )
    }

    /// Declares a controller tree. Resolution is deferred to [`BootContext::finalize`].
    ///
    /// Declaring an identical tree again is a no-op; declaring the same controller type
    /// with another prefix or route set is an error.
    #[track_caller]
    pub fn controller<C: Injectable>(&self, scope: Scope<C>) -> Result<ScopeId> {
        let origin = Origin::caller();
        let id = scope.id();
        match self.app_tasks.declare_controller(id) {
            Declaration::New => {}
            Declaration::Repeated => {
                tracing::debug!(controller = ?id, "controller already declared");
                return Ok(id);
            }
            Declaration::Conflict(existing) => {
                tracing::error!(controller = ?id, existing = ?existing, "conflicting controller declaration");
                return Err(BootError::ConflictingController {
                    controller: id.name().to_string(),
                });
            }
        }
        self.schedule(
            origin,
            Box::new(move |ctx: &BootContext| resolve_controller(ctx, scope)),
        )?;
        Ok(id)
    }

    /// Declares a top-level function view. It needs no injection and is mounted right away.
    /// The same handler may back several views with different paths or methods.
    pub fn endpoint(&self, endpoint: Endpoint) -> Result<ScopeId> {
        let id = endpoint.id();
        if self.app_tasks.declare_endpoint(id) == Declaration::Repeated {
            tracing::debug!(endpoint = ?id, "endpoint already declared");
            return Ok(id);
        }
        resolve_endpoint(self, endpoint)?;
        Ok(id)
    }

    /// Maps handler errors returned as [`Raised<E>`](crate::exception::Raised) to the
    /// response built by `handler`. Registering `E` again replaces the earlier handler.
    pub fn exception_handler<E, F, R>(&self, handler: F)
    where
        E: Send + Sync + 'static,
        F: Fn(&E) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        self.exception_handlers.add(handler);
    }

    /// Runs `callback` on the application router once every controller is attached.
    /// Callbacks run in registration order.
    pub fn on_app_ready(&self, callback: impl FnOnce(Router) -> Router + Send + 'static) {
        self.app_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    pub(crate) fn ready(&self, mut app: Router) -> Router {
        let callbacks = std::mem::take(&mut *self.app_ready.lock().unwrap_or_else(PoisonError::into_inner));
        if !callbacks.is_empty() {
            tracing::debug!(callbacks = callbacks.len(), "running app-ready callbacks");
        }
        for callback in callbacks {
            app = callback(app);
        }
        self.exception_handlers.install(app)
    }

    pub fn schedule(&self, origin: Origin, task: Task) -> Result<()> {
        self.tasks.schedule(origin, task)
    }

    /// Lookup honouring the scan/timeout knobs.
    pub fn inject<T: ?Sized + Send + Sync + 'static>(&self, name: Option<&str>) -> Result<Arc<T>> {
        self.injector().inject::<T>(name)
    }

    /// Non-blocking lookup.
    pub fn lookup<T: ?Sized + Send + Sync + 'static>(&self, name: Option<&str>) -> Option<Arc<T>> {
        self.store.resolve::<T>(name)
    }

    /// Drains every pending origin.
    ///
    /// With scanning enabled each origin runs on its own thread so that a task waiting on
    /// a dependency of another origin does not stall it; otherwise origins run one after
    /// another in first-schedule order. The first failure is returned.
    pub fn finalize(&self) -> Result<()> {
        loop {
            let origins = self.tasks.pending_origins();
            if origins.is_empty() {
                return Ok(());
            }
            tracing::info!(
                origins = origins.len(),
                scan = self.config.scan,
                "draining deferred tasks"
            );

            if self.config.scan && origins.len() > 1 {
                let results: Vec<Result<()>> = thread::scope(|s| {
                    let handles: Vec<_> = origins
                        .iter()
                        .map(|&origin| s.spawn(move || self.drain(origin)))
                        .collect();
                    handles
                        .into_iter()
                        .map(|handle| {
                            handle.join().unwrap_or_else(|_| {
                                Err(BootError::Internal("deferred task panicked".to_string()))
                            })
                        })
                        .collect()
                });
                results.into_iter().collect::<Result<Vec<()>>>()?;
            } else {
                for origin in origins {
                    self.drain(origin)?;
                }
            }
        }
    }

    fn drain(&self, origin: Origin) -> Result<()> {
        let tasks = self.tasks.take(origin)?;
        tracing::debug!(%origin, tasks = tasks.len(), "running deferred tasks");
        for task in tasks {
            task(self)?;
        }
        Ok(())
    }

    pub(crate) fn app_tasks(&self) -> &AppTaskStore {
        &self.app_tasks
    }

    /// Resets every store, including the registered config service.
    pub fn clear(&self) {
        self.store.clear();
        self.tasks.clear();
        self.app_tasks.clear();
        self.signatures.clear();
        self.exception_handlers.clear();
        self.app_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.store.add(None, Arc::new(self.config_service.clone()));
    }
}

impl Default for BootContext {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_injectable<T: Injectable>(name: Option<String>) -> Task {
    Box::new(move |ctx: &BootContext| {
        let instance = ctx.injector().create::<T>()?;
        ctx.store().add(name.as_deref(), Arc::new(instance));
        Ok(())
    })
}

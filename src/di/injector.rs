use crate::config::BootConfig;
use crate::di::key::{TypeKey, Value, unerase};
use crate::di::{Annotation, Args, DependencyStore, Injectable, Signature, SignatureCache};
use crate::error::{BootError, Result};
use std::any::TypeId;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Resolves dependencies against a [`DependencyStore`].
///
/// Lookups poll the store until `inject_timeout` elapses when scanning is enabled, so
/// registrations made concurrently by other origins are picked up. The wait blocks the
/// calling thread; it only runs during bootstrap.
#[derive(Clone, Copy)]
pub struct Injector<'a> {
    store: &'a DependencyStore,
    config: &'a BootConfig,
    signatures: &'a SignatureCache,
}

impl<'a> Injector<'a> {
    pub fn new(
        store: &'a DependencyStore,
        config: &'a BootConfig,
        signatures: &'a SignatureCache,
    ) -> Self {
        Self {
            store,
            config,
            signatures,
        }
    }

    pub fn store(&self) -> &'a DependencyStore {
        self.store
    }

    pub fn inject<T: ?Sized + Send + Sync + 'static>(&self, name: Option<&str>) -> Result<Arc<T>> {
        let value = self.inject_value(&TypeKey::of::<T>(), name)?;
        unerase::<T>(&value).ok_or_else(|| BootError::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        })
    }

    pub fn inject_value(&self, ty: &TypeKey, name: Option<&str>) -> Result<Value> {
        let start = Instant::now();
        loop {
            if let Some(value) = self.store.resolve_value(ty, name) {
                return Ok(value);
            }
            if !self.config.scan {
                return Err(BootError::not_found(ty.name(), name));
            }
            thread::sleep(self.config.inject_retry_step);
            if start.elapsed() > self.config.inject_timeout {
                tracing::warn!(
                    dependency = ty.name(),
                    name = name.unwrap_or_default(),
                    timeout = ?self.config.inject_timeout,
                    "gave up waiting for dependency"
                );
                return Err(BootError::not_found(ty.name(), name));
            }
        }
    }

    /// Resolves every non-variadic parameter of `signature` in declaration order.
    pub fn resolve_params(&self, signature: &Signature) -> Result<Args> {
        let mut args = Args::new(signature.target().to_string().into());
        for param in signature.params() {
            if param.param_kind().is_variadic() {
                continue;
            }
            let value = match (param.default_value(), param.annotation()) {
                (Some(default), _) => default,
                (None, Annotation::Qualified(ty, qualifier)) => {
                    self.inject_value(ty, Some(qualifier))?
                }
                (None, Annotation::Type(ty)) => self.inject_value(ty, None)?,
                (None, Annotation::Missing) => {
                    return Err(BootError::inject_fail(signature.target(), param.name()));
                }
            };
            args.push(param, value);
        }
        Ok(args)
    }

    /// Constructor injection; the descriptor table of `T` is built once.
    pub fn create<T: Injectable>(&self) -> Result<T> {
        let signature = self
            .signatures
            .get_or_build(TypeId::of::<T>(), T::signature);
        let args = self.resolve_params(&signature)?;
        T::construct(args)
    }
}

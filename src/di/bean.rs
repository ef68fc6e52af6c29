use crate::context::BootContext;
use crate::di::{Args, Param, Signature, Task};
use crate::error::BootError;
use std::sync::Arc;

type Factory<R> = Box<dyn FnOnce(Args) -> anyhow::Result<Arc<R>> + Send>;

/// A factory whose product is registered under `R` and an optional qualifier.
///
/// ```
/// use axum_boot::prelude::*;
///
/// #[derive(Debug)]
/// struct Book(&'static str);
///
/// let classics = Bean::new(|_| Ok(vec![Book("Journey to the West")])).named("classics");
/// ```
pub struct Bean<R: ?Sized> {
    name: Option<String>,
    signature: Signature,
    factory: Factory<R>,
}

impl<R: Send + Sync + 'static> Bean<R> {
    pub fn new<F>(factory: F) -> Self
    where
        F: FnOnce(Args) -> anyhow::Result<R> + Send + 'static,
    {
        Self::shared(move |args| factory(args).map(Arc::new))
    }
}

impl<R: ?Sized + Send + Sync + 'static> Bean<R> {
    /// Factory returning an already shared instance, e.g. `Arc<dyn Trait>`.
    pub fn shared<F>(factory: F) -> Self
    where
        F: FnOnce(Args) -> anyhow::Result<Arc<R>> + Send + 'static,
    {
        Self {
            name: None,
            signature: Signature::new(format!("bean {}", std::any::type_name::<R>())),
            factory: Box::new(factory),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declares a factory parameter, resolved like a constructor parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.signature = self.signature.param(param);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn into_task(self) -> Task {
        let Bean {
            name,
            signature,
            factory,
        } = self;
        Box::new(move |ctx: &BootContext| {
            let args = ctx.injector().resolve_params(&signature)?;
            let instance = factory(args).map_err(|source| BootError::Factory {
                target: signature.target().to_string(),
                source,
            })?;
            ctx.store().add::<R>(name.as_deref(), instance);
            Ok(())
        })
    }
}

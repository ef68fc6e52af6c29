use crate::di::key::{Value, unerase};
use crate::error::BootError;
use crate::middleware::WsChain;
use crate::routing::synthetic_param;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// What the resolver hands to an endpoint on every call: the scope instance and the
/// values of its synthetic parameters.
#[derive(Clone)]
pub(crate) struct Splice {
    pub(crate) instance: Value,
    pub(crate) params: Arc<HashMap<String, Value>>,
    pub(crate) ws: WsChain,
}

/// The scope instance seen by an endpoint, together with the scope's use-dependencies.
///
/// ```
/// use axum_boot::prelude::*;
///
/// #[derive(Injectable)]
/// struct Greeter;
///
/// async fn greet(this: This<Greeter>) -> Result<String> {
///     let ua = this.dep::<String>("ua")?;
///     Ok(format!("hello {ua}"))
/// }
/// ```
pub struct This<C> {
    instance: Arc<C>,
    params: Arc<HashMap<String, Value>>,
}

impl<C: Send + Sync + 'static> This<C> {
    pub(crate) fn from_splice(splice: &Splice) -> Result<Self, BootError> {
        let instance = unerase::<C>(&splice.instance).ok_or_else(|| BootError::DowncastFailed {
            type_name: std::any::type_name::<C>().to_string(),
        })?;
        Ok(Self {
            instance,
            params: Arc::clone(&splice.params),
        })
    }

    /// Value of the use-dependency declared under `attr`.
    pub fn dep<T: Send + Sync + 'static>(&self, attr: &str) -> Result<Arc<T>, BootError> {
        let value = self
            .params
            .get(&synthetic_param(attr))
            .ok_or_else(|| BootError::not_found(std::any::type_name::<T>(), Some(attr)))?;
        unerase::<T>(value).ok_or_else(|| BootError::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        })
    }

    pub fn instance(&self) -> &Arc<C> {
        &self.instance
    }
}

impl<C> Deref for This<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl<C> Clone for This<C> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            params: Arc::clone(&self.params),
        }
    }
}

impl<S, C> FromRequestParts<S> for This<C>
where
    S: Send + Sync,
    C: Send + Sync + 'static,
{
    type Rejection = BootError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let splice = parts.extensions.get::<Splice>().ok_or_else(|| {
            BootError::Internal(format!(
                "{} is only available inside its own scope",
                std::any::type_name::<C>()
            ))
        })?;
        This::from_splice(splice)
    }
}

use crate::di::TypeKey;
use crate::di::key::{Value, erase};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type ExtractFn =
    dyn for<'a> Fn(&'a mut Parts) -> BoxFuture<'a, Result<Value, Response>> + Send + Sync;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`UseDep`]; two markers are equal only if they are the same marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UseDepId(u64);

/// A per-request dependency shared by every direct endpoint of a scope.
///
/// ```
/// use axum_boot::prelude::*;
/// use axum::http::HeaderMap;
///
/// let user_agent = UseDep::from_fn(|headers: HeaderMap| async move {
///     Ok::<_, StatusCode>(
///         headers
///             .get("user-agent")
///             .and_then(|v| v.to_str().ok())
///             .unwrap_or_default()
///             .to_string(),
///     )
/// });
/// ```
#[derive(Clone)]
pub struct UseDep {
    id: UseDepId,
    ty: TypeKey,
    extract: Arc<ExtractFn>,
}

impl UseDep {
    fn build<T, F>(extract: F) -> Self
    where
        T: ?Sized + 'static,
        F: for<'a> Fn(&'a mut Parts) -> BoxFuture<'a, Result<Value, Response>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: UseDepId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            ty: TypeKey::of::<T>(),
            extract: Arc::new(extract),
        }
    }

    /// Runs the extractor `E`; handlers read the value as `Arc<E>`.
    pub fn extract<E>() -> Self
    where
        E: FromRequestParts<()> + Send + Sync + 'static,
    {
        Self::build::<E, _>(|parts| {
            Box::pin(async move {
                E::from_request_parts(parts, &())
                    .await
                    .map(|value| erase(Arc::new(value)))
                    .map_err(IntoResponse::into_response)
            })
        })
    }

    /// Runs `f` on the extractor `E`; handlers read the value as `Arc<T>`.
    pub fn from_fn<F, Fut, E, T, R>(f: F) -> Self
    where
        F: Fn(E) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, R>> + Send + 'static,
        E: FromRequestParts<()> + Send + 'static,
        T: Send + Sync + 'static,
        R: IntoResponse + 'static,
    {
        Self::build::<T, _>(move |parts| {
            let f = f.clone();
            Box::pin(async move {
                let input = E::from_request_parts(parts, &())
                    .await
                    .map_err(IntoResponse::into_response)?;
                f(input)
                    .await
                    .map(|value| erase(Arc::new(value)))
                    .map_err(IntoResponse::into_response)
            })
        })
    }

    pub fn id(&self) -> UseDepId {
        self.id
    }

    pub fn type_key(&self) -> TypeKey {
        self.ty
    }

    pub(crate) fn resolve<'a>(&self, parts: &'a mut Parts) -> BoxFuture<'a, Result<Value, Response>> {
        (self.extract)(parts)
    }
}

impl PartialEq for UseDep {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for UseDep {}

impl fmt::Debug for UseDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseDep")
            .field("id", &self.id)
            .field("type", &self.ty)
            .finish()
    }
}

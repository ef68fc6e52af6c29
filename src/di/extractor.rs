use crate::di::DependencyStore;
use crate::error::BootError;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode as HttpStatusCode, request::Parts},
};
use std::marker::PhantomData;
use std::sync::Arc;

/// Request extension carrying the dependency store of a bootstrapped application.
#[derive(Clone)]
pub struct Dependencies(pub Arc<DependencyStore>);

impl Dependencies {
    fn from_parts(parts: &Parts) -> Result<&Self, (HttpStatusCode, String)> {
        parts.extensions.get::<Dependencies>().ok_or_else(|| {
            (
                HttpStatusCode::INTERNAL_SERVER_ERROR,
                "Dependency injection failed: the router was not built by provide_app".to_string(),
            )
        })
    }
}

/// Axum extractor for dependency injection
///
/// Resolves a registered singleton straight into a handler parameter.
///
/// # Example
/// ```
/// use axum_boot::Inject;
///
/// struct BookService;
///
/// impl BookService {
///     fn count(&self) -> usize {
///         4
///     }
/// }
///
/// async fn count_books(Inject(service): Inject<BookService>) -> String {
///     service.count().to_string()
/// }
/// ```
pub struct Inject<T: ?Sized>(pub Arc<T>);

impl<S, T> FromRequestParts<S> for Inject<T>
where
    S: Send + Sync,
    T: ?Sized + Send + Sync + 'static,
{
    type Rejection = (HttpStatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let dependencies = Dependencies::from_parts(parts)?;
        dependencies.0.resolve::<T>(None).map(Inject).ok_or_else(|| {
            (
                HttpStatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Dependency injection failed: {}",
                    BootError::not_found(std::any::type_name::<T>(), None)
                ),
            )
        })
    }
}

/// Deref implementation for convenient access to the inner service
impl<T: ?Sized> std::ops::Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ?Sized> Clone for Inject<T> {
    fn clone(&self) -> Self {
        Inject(Arc::clone(&self.0))
    }
}

/// Names the qualifier used by [`InjectNamed`].
pub trait Qualifier: Send + Sync + 'static {
    const NAME: &'static str;
}

/// Like [`Inject`], resolving `(T, Q::NAME)`.
pub struct InjectNamed<T: ?Sized, Q>(pub Arc<T>, PhantomData<fn() -> Q>);

impl<S, T, Q> FromRequestParts<S> for InjectNamed<T, Q>
where
    S: Send + Sync,
    T: ?Sized + Send + Sync + 'static,
    Q: Qualifier,
{
    type Rejection = (HttpStatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let dependencies = Dependencies::from_parts(parts)?;
        match dependencies.0.resolve::<T>(Some(Q::NAME)) {
            Some(instance) => Ok(InjectNamed(instance, PhantomData)),
            None => Err((
                HttpStatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Dependency injection failed: {}",
                    BootError::not_found(std::any::type_name::<T>(), Some(Q::NAME))
                ),
            )),
        }
    }
}

impl<T: ?Sized, Q> std::ops::Deref for InjectNamed<T, Q> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

//! Domain errors raised by handlers and mapped to responses at the edge of the application.
//!
//! A handler returns `Result<T, Raised<E>>`; the error rides along in the response
//! extensions until the layer installed by [`provide_app`](crate::provide_app) hands it
//! to the handler registered for `E` with [`BootContext::exception_handler`](crate::BootContext::exception_handler).

use crate::di::TypeKey;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Handler error carrying a domain error until an exception handler maps it.
/// Without a handler for `E` the response stays a bare 500.
///
/// ```
/// use axum_boot::prelude::*;
/// use axum_boot::exception::Raised;
///
/// struct NotFound;
///
/// async fn find(Path(name): Path<String>) -> std::result::Result<String, Raised<NotFound>> {
///     if name == "journey" { Ok(name) } else { Err(Raised(NotFound)) }
/// }
///
/// let ctx = BootContext::new();
/// ctx.exception_handler(|_: &NotFound| (StatusCode::NOT_FOUND, "no such book"));
/// ```
#[derive(Debug)]
pub struct Raised<E>(pub E);

impl<E> From<E> for Raised<E> {
    fn from(error: E) -> Self {
        Raised(error)
    }
}

#[derive(Clone)]
struct RaisedError {
    error: Arc<dyn Any + Send + Sync>,
    ty: TypeKey,
}

impl<E: Send + Sync + 'static> IntoResponse for Raised<E> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        response.extensions_mut().insert(RaisedError {
            error: Arc::new(self.0),
            ty: TypeKey::of::<E>(),
        });
        response
    }
}

type Catch = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Response + Send + Sync>;

/// Exception handlers keyed by error type; the last registration for a type wins.
#[derive(Default)]
pub(crate) struct ExceptionHandlers {
    handlers: DashMap<TypeKey, Catch>,
}

impl ExceptionHandlers {
    pub(crate) fn add<E, F, R>(&self, handler: F)
    where
        E: Send + Sync + 'static,
        F: Fn(&E) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        let ty = TypeKey::of::<E>();
        let catch: Catch = Arc::new(move |error: &(dyn Any + Send + Sync)| {
            match error.downcast_ref::<E>() {
                Some(error) => handler(error).into_response(),
                None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        });
        if self.handlers.insert(ty, catch).is_some() {
            tracing::warn!(error = ty.name(), "exception handler replaced");
        }
    }

    pub(crate) fn clear(&self) {
        self.handlers.clear();
    }

    /// Installs the mapping layer over every route of `app`.
    pub(crate) fn install(&self, app: Router) -> Router {
        let table: Arc<HashMap<TypeKey, Catch>> = Arc::new(
            self.handlers
                .iter()
                .map(|entry| (*entry.key(), Arc::clone(entry.value())))
                .collect(),
        );
        tracing::debug!(handlers = table.len(), "installing exception handlers");
        app.layer(axum::middleware::map_response(move |response: Response| {
            let table = Arc::clone(&table);
            async move { catch(&table, response) }
        }))
    }
}

fn catch(table: &HashMap<TypeKey, Catch>, mut response: Response) -> Response {
    let Some(raised) = response.extensions_mut().remove::<RaisedError>() else {
        return response;
    };
    match table.get(&raised.ty) {
        Some(handler) => handler(raised.error.as_ref()),
        None => {
            tracing::error!(error = raised.ty.name(), "no exception handler for raised error");
            response
        }
    }
}

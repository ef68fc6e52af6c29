//! # axum-boot
//!
//! Declarative controllers, dependency injection and scoped middleware on top of axum.
//!
//! Declarations made on a [`BootContext`] are deferred: services, factories and controller
//! trees are only constructed when the context is finalized, so a module can declare
//! something that depends on a service declared elsewhere.
//!
//! ## Features
//!
//! - **Dependency Injection**: constructor injection by type, or by type and qualifier
//! - **Controller-based Routing**: nested route trees mounted under one anchor per controller
//! - **Use-dependencies**: per-request values shared by every endpoint of a scope
//! - **Scoped Middleware**: HTTP and WebSocket middleware limited to the endpoints of a scope
//! - **Exception Handlers**: domain errors raised by handlers mapped to responses by type
//! - **Trait Object Support**: inject `Arc<dyn Trait>` through explicit bindings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum_boot::prelude::*;
//!
//! #[derive(Injectable)]
//! pub struct BookService;
//!
//! impl BookService {
//!     pub fn titles(&self) -> Vec<String> {
//!         vec!["Journey to the West".to_string()]
//!     }
//! }
//!
//! #[derive(Injectable)]
//! pub struct BookController {
//!     books: Arc<BookService>,
//! }
//!
//! async fn list(this: This<BookController>) -> Json<BaseResp<Vec<String>>> {
//!     Json(BaseResp::ok(this.books.titles()))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = BootContext::new();
//!     ctx.injectable::<BookService>()?;
//!     ctx.controller(Controller::<BookController>::new("/book").get("", list))?;
//!
//!     let app = provide_app(&ctx, None, &[])?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//!     Ok(())
//! }
//! ```

extern crate self as axum_boot;

pub mod bootstrap;
pub mod common;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod exception;
pub mod middleware;
pub mod routing;
pub mod sql;

// Re-export core types
pub use bootstrap::{Application, ApplicationBuilder, provide_app};
pub use common::BaseResp;
pub use config::{BootConfig, ConfigService};
pub use context::{BootContext, BootContextBuilder};
pub use di::{Bean, Inject, InjectNamed, Injectable, Qualifier};
pub use error::{BootError, Result};
pub use exception::Raised;
pub use routing::{Controller, Endpoint, Prefix, Scope, ScopeId, This, UseDep};

// Re-export macros
pub use axum_boot_macro::Injectable as DeriveInjectable;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use axum_boot::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bootstrap::{Application, ApplicationBuilder, provide_app};
    pub use crate::common::BaseResp;
    pub use crate::config::{BootConfig, ConfigService};
    pub use crate::context::BootContext;
    pub use crate::di::{Args, Bean, Inject, InjectNamed, Injectable, Param, Qualifier, Signature};
    pub use crate::error::{BootError, Result};
    pub use crate::exception::Raised;
    pub use crate::middleware::{
        LoggingMiddleware, Middleware, Next, UseMiddlewareRecord, WsEvent, WsMiddleware, WsNext,
        from_fn, from_ws_fn,
    };
    pub use crate::routing::{Controller, Endpoint, Prefix, Scope, ScopeId, This, UseDep};
    pub use crate::DeriveInjectable as Injectable;
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        extract::{Path, Query},
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}

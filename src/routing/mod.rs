//! Declarative route trees resolved into axum routers.
//!
//! A [`Controller`] is declared on the [`BootContext`](crate::BootContext); at
//! finalization its instance is built through the injector, every endpoint of the tree is
//! mounted into one anchor router under the controller prefix, and middleware declared on
//! each level is attached as a scoped layer. Nothing reaches the application until the
//! bootstrap emits the controller's attachment tasks.

mod anchor;
mod app_task;
mod path;
mod record;
mod resolver;
mod this;
mod use_dep;

pub(crate) use app_task::{AppTask, AppTaskStore, Declaration};
pub use path::{join_path, route_path};
pub use record::{Controller, Endpoint, Prefix, RouteKind, Scope, ScopeId};
pub(crate) use resolver::{resolve_controller, resolve_endpoint, synthetic_param};
pub use resolver::USE_DEP_PARAM_PREFIX;
pub use this::This;
pub use use_dep::{UseDep, UseDepId};

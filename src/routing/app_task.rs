use crate::di::TypeKey;
use crate::routing::ScopeId;
use axum::Router;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Work applied to the application router once it exists.
pub(crate) type AppTask = Box<dyn FnOnce(Router) -> Router + Send>;

#[derive(Default)]
struct Queues {
    order: Vec<ScopeId>,
    tasks: HashMap<ScopeId, Vec<AppTask>>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Declaration {
    New,
    Repeated,
    /// The controller type is already declared with another tree.
    Conflict(ScopeId),
}

/// Attachment tasks keyed by controller or endpoint identity.
#[derive(Default)]
pub(crate) struct AppTaskStore {
    queues: Mutex<Queues>,
    controllers: DashMap<TypeKey, ScopeId>,
    endpoints: DashSet<ScopeId>,
}

impl AppTaskStore {
    /// One tree per controller type.
    pub(crate) fn declare_controller(&self, id: ScopeId) -> Declaration {
        match self.controllers.entry(id.type_key()) {
            Entry::Occupied(existing) if *existing.get() == id => Declaration::Repeated,
            Entry::Occupied(existing) => Declaration::Conflict(*existing.get()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Declaration::New
            }
        }
    }

    pub(crate) fn declare_endpoint(&self, id: ScopeId) -> Declaration {
        if self.endpoints.insert(id) {
            Declaration::New
        } else {
            Declaration::Repeated
        }
    }

    pub(crate) fn add(&self, id: ScopeId, task: AppTask) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        if !queues.tasks.contains_key(&id) {
            queues.order.push(id);
        }
        queues.tasks.entry(id).or_default().push(task);
    }

    /// Applies and forgets the tasks of `id` in insertion order.
    pub(crate) fn emit(&self, id: ScopeId, mut app: Router) -> (Router, usize) {
        let tasks = {
            let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
            queues.order.retain(|pending| *pending != id);
            queues.tasks.remove(&id).unwrap_or_default()
        };
        let emitted = tasks.len();
        for task in tasks {
            app = task(app);
        }
        (app, emitted)
    }

    pub(crate) fn pending(&self) -> Vec<ScopeId> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.order.clone()
    }

    pub(crate) fn clear(&self) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        *queues = Queues::default();
        self.controllers.clear();
        self.endpoints.clear();
    }
}

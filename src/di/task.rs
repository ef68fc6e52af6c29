use crate::context::BootContext;
use crate::error::{BootError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::Location;
use std::sync::{Mutex, PoisonError};

/// Deferred registration, run once when the context is finalized.
pub type Task = Box<dyn FnOnce(&BootContext) -> Result<()> + Send>;

/// The source unit a declaration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Origin(&'static str);

impl Origin {
    pub const fn new(unit: &'static str) -> Self {
        Self(unit)
    }

    /// File of the calling declaration.
    #[track_caller]
    pub fn caller() -> Self {
        Self(Location::caller().file())
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Default)]
struct Queues {
    order: Vec<Origin>,
    pending: HashMap<Origin, Vec<Task>>,
    drained: HashSet<Origin>,
}

/// Per-origin queues of deferred tasks. Declaration order inside one origin is kept;
/// nothing is promised across origins.
#[derive(Default)]
pub struct TaskStore {
    queues: Mutex<Queues>,
}

impl TaskStore {
    pub fn schedule(&self, origin: Origin, task: Task) -> Result<()> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        if queues.drained.contains(&origin) {
            return Err(BootError::OriginAlreadyDrained {
                origin: origin.to_string(),
            });
        }
        if !queues.pending.contains_key(&origin) {
            queues.order.push(origin);
        }
        queues.pending.entry(origin).or_default().push(task);
        tracing::debug!(%origin, "task scheduled");
        Ok(())
    }

    /// Removes and returns the queue of `origin`; a second call for the same origin fails.
    pub fn take(&self, origin: Origin) -> Result<Vec<Task>> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        if !queues.drained.insert(origin) {
            return Err(BootError::OriginAlreadyDrained {
                origin: origin.to_string(),
            });
        }
        queues.order.retain(|o| *o != origin);
        Ok(queues.pending.remove(&origin).unwrap_or_default())
    }

    /// Origins with queued tasks, in first-schedule order.
    pub fn pending_origins(&self) -> Vec<Origin> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.order.clone()
    }

    pub fn is_drained(&self, origin: Origin) -> bool {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.drained.contains(&origin)
    }

    pub fn clear(&self) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        *queues = Queues::default();
    }
}

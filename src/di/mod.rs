mod bean;
mod extractor;
mod injectable;
mod injector;
pub(crate) mod key;
mod signature;
mod store;
mod task;

pub use bean::Bean;
pub use extractor::{Dependencies, Inject, InjectNamed, Qualifier};
pub use injectable::Injectable;
pub use injector::Injector;
pub use key::{DependencyKey, TypeKey, Value};
pub use signature::{Annotation, Args, Param, ParamKind, Signature, SignatureCache};
pub use store::DependencyStore;
pub use task::{Origin, Task, TaskStore};

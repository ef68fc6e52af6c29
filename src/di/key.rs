use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased stored value. It always holds an `Arc<T>` for the key's `T`, which lets
/// unsized targets such as `dyn Trait` live in the same map as concrete types.
pub type Value = Arc<dyn Any + Send + Sync>;

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Value {
    Arc::new(instance)
}

pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(value: &Value) -> Option<Arc<T>> {
    value.downcast_ref::<Arc<T>>().cloned()
}

/// A type identity plus its name for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// `(type, optional qualifier)` identifying one registered instance.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DependencyKey {
    pub ty: TypeKey,
    pub name: Option<Cow<'static, str>>,
}

impl DependencyKey {
    pub fn new(ty: TypeKey, name: Option<Cow<'static, str>>) -> Self {
        Self { ty, name }
    }

    pub fn of<T: ?Sized + 'static>(name: Option<&str>) -> Self {
        Self {
            ty: TypeKey::of::<T>(),
            name: name.map(|n| Cow::Owned(n.to_string())),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}]", self.ty.name, name),
            None => f.write_str(self.ty.name),
        }
    }
}

use crate::di::key::{TypeKey, Value, erase, unerase};
use crate::error::{BootError, Result};
use dashmap::DashMap;
use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How a parameter is passed to its callable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    KeywordOnly,
    VarPositional,
    VarKeyword,
}

impl ParamKind {
    pub fn is_variadic(self) -> bool {
        matches!(self, ParamKind::VarPositional | ParamKind::VarKeyword)
    }
}

#[derive(Clone, Debug)]
pub enum Annotation {
    Missing,
    Type(TypeKey),
    Qualified(TypeKey, Cow<'static, str>),
}

type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// One entry of a callable's descriptor table.
#[derive(Clone)]
pub struct Param {
    name: Cow<'static, str>,
    kind: ParamKind,
    annotation: Annotation,
    default: Option<DefaultFn>,
}

impl Param {
    /// A parameter with neither annotation nor default.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalOrKeyword,
            annotation: Annotation::Missing,
            default: None,
        }
    }

    pub fn typed<T: ?Sized + Send + Sync + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            annotation: Annotation::Type(TypeKey::of::<T>()),
            ..Self::new(name)
        }
    }

    pub fn qualified<T: ?Sized + Send + Sync + 'static>(
        name: impl Into<Cow<'static, str>>,
        qualifier: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            annotation: Annotation::Qualified(TypeKey::of::<T>(), qualifier.into()),
            ..Self::new(name)
        }
    }

    /// Type annotation known only at runtime.
    pub fn annotated(name: impl Into<Cow<'static, str>>, ty: TypeKey) -> Self {
        Self {
            annotation: Annotation::Type(ty),
            ..Self::new(name)
        }
    }

    pub fn variadic(name: impl Into<Cow<'static, str>>, kind: ParamKind) -> Self {
        Self::new(name).kind(kind)
    }

    /// The default wins over any annotation; `produce` runs once per resolution.
    pub fn with_default<T, F>(mut self, produce: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(move || erase(Arc::new(produce()))));
        self
    }

    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn positional_only(self) -> Self {
        self.kind(ParamKind::PositionalOnly)
    }

    pub fn keyword_only(self) -> Self {
        self.kind(ParamKind::KeywordOnly)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_kind(&self) -> ParamKind {
        self.kind
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(|produce| produce())
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("annotation", &self.annotation)
            .field("has_default", &self.has_default())
            .finish()
    }
}

/// Descriptor table of a constructor, factory or endpoint.
#[derive(Clone, Debug)]
pub struct Signature {
    target: Cow<'static, str>,
    params: Vec<Param>,
}

impl Signature {
    pub fn new(target: impl Into<Cow<'static, str>>) -> Self {
        Self {
            target: target.into(),
            params: Vec::new(),
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

/// Values resolved for a [`Signature`], split the way they are passed.
pub struct Args {
    target: Cow<'static, str>,
    positional: Vec<(Cow<'static, str>, Value)>,
    keyword: HashMap<Cow<'static, str>, Value>,
}

impl Args {
    pub(crate) fn new(target: Cow<'static, str>) -> Self {
        Self {
            target,
            positional: Vec::new(),
            keyword: HashMap::new(),
        }
    }

    pub(crate) fn push(&mut self, param: &Param, value: Value) {
        if param.kind == ParamKind::PositionalOnly {
            self.positional.push((param.name.clone(), value));
        } else {
            self.keyword.insert(param.name.clone(), value);
        }
    }

    /// Shared handle to the value bound to `name`.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let value = self.find(name)?;
        unerase::<T>(value).ok_or_else(|| self.downcast_failed::<T>(name))
    }

    /// Moves the value bound to `name` out. Only works for values nobody else holds,
    /// which is the case for parameter defaults.
    pub fn take<T: Send + Sync + 'static>(&mut self, name: &str) -> Result<T> {
        let value = if let Some(value) = self.keyword.remove(name) {
            value
        } else if let Some(index) = self.positional.iter().position(|(n, _)| n == name) {
            self.positional.remove(index).1
        } else {
            return Err(BootError::inject_fail(&self.target, name));
        };
        let outer = value
            .downcast::<Arc<T>>()
            .map_err(|_| self.downcast_failed::<T>(name))?;
        Arc::try_unwrap(outer)
            .ok()
            .and_then(|inner| Arc::try_unwrap(inner).ok())
            .ok_or_else(|| {
                BootError::Internal(format!(
                    "value of '{name}' for {} is shared and cannot be moved",
                    self.target
                ))
            })
    }

    pub fn positional(&self) -> impl Iterator<Item = &Value> {
        self.positional.iter().map(|(_, value)| value)
    }

    pub fn keyword_names(&self) -> impl Iterator<Item = &str> {
        self.keyword.keys().map(|name| name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, name: &str) -> Result<&Value> {
        self.keyword
            .get(name)
            .or_else(|| {
                self.positional
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, value)| value)
            })
            .ok_or_else(|| BootError::inject_fail(&self.target, name))
    }

    fn downcast_failed<T: ?Sized>(&self, name: &str) -> BootError {
        BootError::DowncastFailed {
            type_name: format!(
                "{} (parameter '{name}' of {})",
                std::any::type_name::<T>(),
                self.target
            ),
        }
    }
}

/// Descriptor tables computed once per callable identity.
#[derive(Default)]
pub struct SignatureCache {
    entries: DashMap<TypeId, Arc<Signature>>,
}

impl SignatureCache {
    pub fn get_or_build(&self, id: TypeId, build: impl FnOnce() -> Signature) -> Arc<Signature> {
        Arc::clone(self.entries.entry(id).or_insert_with(|| Arc::new(build())).value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

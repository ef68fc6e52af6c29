use crate::di::key::{DependencyKey, TypeKey, Value, erase, unerase};
use dashmap::DashMap;
use std::sync::Arc;

/// Singleton registry keyed by `(type, qualifier)`.
///
/// Writes are last-write-wins; an overwrite is reported through `tracing` and never
/// fails. Reads never block and never create keys.
#[derive(Default)]
pub struct DependencyStore {
    entries: DashMap<DependencyKey, Value>,
}

impl DependencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: ?Sized + Send + Sync + 'static>(&self, name: Option<&str>, instance: Arc<T>) {
        self.add_value(DependencyKey::of::<T>(name), erase(instance));
    }

    pub fn add_value(&self, key: DependencyKey, value: Value) {
        if self.entries.insert(key.clone(), value).is_some() {
            tracing::warn!(dependency = %key, "dependency already registered, replacing it");
        } else {
            tracing::debug!(dependency = %key, "dependency registered");
        }
    }

    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self, name: Option<&str>) -> Option<Arc<T>> {
        let key = DependencyKey::of::<T>(name);
        self.entries.get(&key).and_then(|entry| unerase::<T>(entry.value()))
    }

    pub fn resolve_value(&self, ty: &TypeKey, name: Option<&str>) -> Option<Value> {
        // Borrowed lookup would need a second key type; qualifiers are short.
        let key = DependencyKey::new(*ty, name.map(|n| n.to_string().into()));
        self.entries.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains<T: ?Sized + 'static>(&self, name: Option<&str>) -> bool {
        self.entries.contains_key(&DependencyKey::of::<T>(name))
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

#[cfg(test)]
mod tests {
    use super::*;

    struct TestService {
        value: i32,
    }

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_add_and_resolve() {
        let store = DependencyStore::new();
        store.add(None, Arc::new(TestService { value: 42 }));
        let service = store.resolve::<TestService>(None).unwrap();
        assert_eq!(service.value, 42);
    }

    #[test]
    fn test_qualified_entries_are_separate() {
        let store = DependencyStore::new();
        store.add(None, Arc::new(TestService { value: 1 }));
        store.add(Some("other"), Arc::new(TestService { value: 2 }));

        assert_eq!(store.resolve::<TestService>(None).unwrap().value, 1);
        assert_eq!(store.resolve::<TestService>(Some("other")).unwrap().value, 2);
        assert!(store.resolve::<TestService>(Some("missing")).is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let store = DependencyStore::new();
        store.add(Some("x"), Arc::new(TestService { value: 1 }));
        let second = Arc::new(TestService { value: 2 });
        store.add(Some("x"), Arc::clone(&second));

        let resolved = store.resolve::<TestService>(Some("x")).unwrap();
        assert!(Arc::ptr_eq(&resolved, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_trait_object_entries() {
        let store = DependencyStore::new();
        store.add::<dyn Greeter>(None, Arc::new(English));
        let greeter = store.resolve::<dyn Greeter>(None).unwrap();
        assert_eq!(greeter.greet(), "hello");
        assert!(!store.contains::<English>(None));
    }

    #[test]
    fn test_resolve_does_not_create_keys() {
        let store = DependencyStore::new();
        assert!(store.resolve::<TestService>(None).is_none());
        assert!(store.is_empty());
    }
}

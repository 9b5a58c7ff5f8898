use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{KeyValueStore, StoredValue};

/// Volatile store for tests and hosts without a data directory.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: StoredValue) {
        self.values.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(!store.get_bool("flag"));
        assert_eq!(store.get_int("count"), 0);
        assert_eq!(store.get_string("text"), None);

        store.set_bool("flag", true);
        store.set_int("count", 3);
        store.set_string("text", "hello");

        assert!(store.get_bool("flag"));
        assert_eq!(store.get_int("count"), 3);
        assert_eq!(store.get_string("text").as_deref(), Some("hello"));
        assert_eq!(store.len(), 3);

        // Mismatched types read as absent.
        assert_eq!(store.get_string("flag"), None);
        assert!(!store.get_bool("text"));

        store.remove("text");
        assert_eq!(store.get("text"), None);
    }
}

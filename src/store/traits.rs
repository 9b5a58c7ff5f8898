use serde::{Deserialize, Serialize};

/// A single persisted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Flag(bool),
    Count(i64),
    Text(String),
}

/// String-keyed store surviving process restarts.
///
/// The contract is infallible: an absent value is the only failure mode.
/// Writes are last-write-wins and readers observe either the old or the
/// new value, never a torn one.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<StoredValue>;
    fn set(&self, key: &str, value: StoredValue);
    fn remove(&self, key: &str);

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(StoredValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Absent or non-boolean values read as `false`.
    fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(StoredValue::Flag(true)))
    }

    /// Absent or non-integer values read as `0`.
    fn get_int(&self, key: &str) -> i64 {
        match self.get(key) {
            Some(StoredValue::Count(n)) => n,
            _ => 0,
        }
    }

    fn set_string(&self, key: &str, value: &str) {
        self.set(key, StoredValue::Text(value.to_string()));
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.set(key, StoredValue::Flag(value));
    }

    fn set_int(&self, key: &str, value: i64) {
        self.set(key, StoredValue::Count(value));
    }
}

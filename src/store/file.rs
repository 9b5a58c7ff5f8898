// File-backed store: a flat JSON object rewritten on every change.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::traits::{KeyValueStore, StoredValue};

pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, StoredValue>>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or create) the store at `path`.
    ///
    /// A missing file starts empty. A file that exists but cannot be parsed
    /// is an error so that a corrupt store is never silently overwritten.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let values = if path.exists() {
            let raw = fs::read_to_string(path)?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str::<HashMap<String, StoredValue>>(&raw).map_err(|e| {
                    anyhow!("corrupt store file {}: {}", path.display(), e)
                })?
            }
        } else {
            HashMap::new()
        };

        debug!(
            "json store opened path={} keys={}",
            path.display(),
            values.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            values: RwLock::new(values),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        let encoded = {
            let values = self.values.read();
            serde_json::to_vec_pretty(&*values)?
        };
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn flush_or_warn(&self, key: &str) {
        if let Err(e) = self.flush() {
            warn!(
                "json store write failed path={} key={}: {}",
                self.path.display(),
                key,
                e
            );
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: StoredValue) {
        self.values.write().insert(key.to_string(), value);
        self.flush_or_warn(key);
    }

    fn remove(&self, key: &str) {
        let removed = self.values.write().remove(key).is_some();
        if removed {
            self.flush_or_warn(key);
        }
    }
}

//! In-process key-value store.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::KeyValueStore;
use crate::error::StorageError;

/// Non-durable [`KeyValueStore`] used by tests and embedders that bring
/// their own persistence.
///
/// `set_available(false)` makes every call fail with
/// [`StorageError::Unavailable`], which is how storage outages are simulated.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory store switched off".into()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        self.check()?;
        let values = self.values.lock().map_err(|_| StorageError::Locked)?;
        Ok(keys
            .iter()
            .filter_map(|k| values.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError> {
        self.check()?;
        let mut values = self.values.lock().map_err(|_| StorageError::Locked)?;
        values.extend(entries);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.check()?;
        let mut values = self.values.lock().map_err(|_| StorageError::Locked)?;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}

use crate::{PrefValue, PreferenceStore, StorageError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Process-local store for tests and hosts without durable preferences.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, PrefValue>>,
    sync_count: AtomicUsize,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `synchronize` has been called.
    pub fn sync_count(&self) -> usize {
        self.sync_count.load(Ordering::SeqCst)
    }

    pub fn entries(&self) -> Result<BTreeMap<String, PrefValue>, StorageError> {
        Ok(self
            .values
            .lock()
            .map_err(|_| StorageError::Poisoned("memory preferences"))?
            .clone())
    }
}

impl PreferenceStore for MemoryPreferences {
    fn value(&self, key: &str) -> Result<Option<PrefValue>, StorageError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StorageError::Poisoned("memory preferences"))?;
        Ok(values.get(key).cloned())
    }

    fn set_value(&self, key: &str, value: PrefValue) -> Result<(), StorageError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StorageError::Poisoned("memory preferences"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StorageError::Poisoned("memory preferences"))?;
        values.remove(key);
        Ok(())
    }

    fn synchronize(&self) -> Result<(), StorageError> {
        self.sync_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

use crate::backend::{StorageBackend, StorageError, StorageKey};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::error;

/// In-memory backend. Like browser local storage it can be limited to a
/// byte quota or switched off entirely.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    values: Arc<Mutex<HashMap<StorageKey, String>>>,
    quota: Option<usize>,
    enabled: bool,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self {
            values: Arc::new(Mutex::default()),
            quota: None,
            enabled: true,
        }
    }
}

impl LocalStorage {
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if !self.enabled {
            let err = StorageError::Unavailable;
            error!(%err);
            return Err(err);
        }
        Ok(())
    }
}

impl StorageBackend for LocalStorage {
    fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        self.check_enabled()?;
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(&key).cloned())
    }

    fn write(&self, key: StorageKey, value: String) -> Result<(), StorageError> {
        self.check_enabled()?;
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(quota) = self.quota {
            let others: usize = values
                .iter()
                .filter(|(stored_key, _)| **stored_key != key)
                .map(|(_, stored)| stored.len())
                .sum();
            let needed = others + value.len();
            if needed > quota {
                let err = StorageError::QuotaExceeded { key, needed, quota };
                error!(%err);
                return Err(err);
            }
        }

        values.insert(key, value);
        Ok(())
    }
}

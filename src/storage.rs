use crate::{
    backend::{StorageBackend, StorageError, StorageKey},
    types::{CompanyInfo, TimeSlot},
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Typed access to the slot collection and the company record.
///
/// Reads never fail: a missing, unreadable or malformed value yields the
/// built-in default. Writes report backend failures as [`StorageError`].
#[derive(Debug, Clone)]
pub struct Storage<B> {
    backend: B,
    write_lock: Arc<Mutex<()>>,
}

/// Exclusive access for one read-modify-write cycle.
pub struct Locked<'a, B> {
    storage: &'a Storage<B>,
    _guard: MutexGuard<'a, ()>,
}

impl<B: StorageBackend> Storage<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn load_slots(&self) -> Vec<TimeSlot> {
        self.load(StorageKey::Slots).unwrap_or_else(TimeSlot::examples)
    }

    pub fn load_config(&self) -> CompanyInfo {
        self.load(StorageKey::Config).unwrap_or_default()
    }

    pub fn save_slots(&self, slots: &[TimeSlot]) -> Result<(), StorageError> {
        self.lock().save_slots(slots)
    }

    pub fn save_config(&self, config: &CompanyInfo) -> Result<(), StorageError> {
        self.lock().save_config(config)
    }

    /// Serializes writers within this process. Other processes sharing the
    /// same medium are not covered.
    pub fn lock(&self) -> Locked<'_, B> {
        Locked {
            storage: self,
            _guard: self
                .write_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(?err, %key, "Failed to read stored value, using default");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(?err, %key, "Stored value is malformed, using default");
                None
            }
        }
    }

    fn store<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.backend.write(key, raw)
    }
}

impl<B: StorageBackend> Locked<'_, B> {
    pub fn load_slots(&self) -> Vec<TimeSlot> {
        self.storage.load_slots()
    }

    pub fn load_config(&self) -> CompanyInfo {
        self.storage.load_config()
    }

    pub fn save_slots(&self, slots: &[TimeSlot]) -> Result<(), StorageError> {
        self.storage.store(StorageKey::Slots, slots)
    }

    pub fn save_config(&self, config: &CompanyInfo) -> Result<(), StorageError> {
        self.storage.store(StorageKey::Config, config)
    }
}

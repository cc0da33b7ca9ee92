use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Slots,
    Config,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Slots => "INTERVIEW_SLOTS",
            StorageKey::Config => "INTERVIEW_CONFIG",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storing {key} needs {needed} bytes but the quota is {quota} bytes")]
    QuotaExceeded {
        key: StorageKey,
        needed: usize,
        quota: usize,
    },

    #[error("Storage is not available")]
    Unavailable,

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Value could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Raw key/value medium holding one JSON document per key.
pub trait StorageBackend: Clone + Send + Sync + 'static {
    /// `Ok(None)` means nothing was stored under `key` yet.
    fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError>;
    fn write(&self, key: StorageKey, value: String) -> Result<(), StorageError>;
}

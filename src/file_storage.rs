use crate::backend::{StorageBackend, StorageError, StorageKey};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::error;

/// Persistent backend keeping every key in `<dir>/<KEY>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                error!(?err, %key, "Failed to read stored value");
                Err(err.into())
            }
        }
    }

    fn write(&self, key: StorageKey, value: String) -> Result<(), StorageError> {
        // Readers never observe a half written file.
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(value.as_bytes())?;
        file.persist(self.path(key)).map_err(|err| {
            error!(err = ?err.error, %key, "Failed to store value");
            StorageError::Io(err.error)
        })?;
        Ok(())
    }
}

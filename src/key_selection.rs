use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Host capability for choosing an API key at runtime. Optional: the
/// greeting works from the configured key alone.
#[cfg_attr(test, mockall::automock)]
pub trait KeySelection: Send + Sync {
    fn has_selected_key(&self) -> bool;
    fn select_key(&self, key: String) -> Result<(), String>;
    fn selected_key(&self) -> Option<String>;
}

/// Keeps the selected key for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct SessionKeySelection {
    key: Arc<RwLock<Option<String>>>,
}

impl KeySelection for SessionKeySelection {
    fn has_selected_key(&self) -> bool {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn select_key(&self, key: String) -> Result<(), String> {
        let key = key.trim();
        if key.is_empty() {
            return Err("API key must not be empty".into());
        }
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = Some(key.to_string());
        info!("API key selected");
        Ok(())
    }

    fn selected_key(&self) -> Option<String> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

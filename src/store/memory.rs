use super::StateStorage;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// In-memory dashboard storage. Contents are lost when dropped.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

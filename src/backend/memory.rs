use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backend::StorageBackend;
use crate::error::StoreError;

/// An in-memory storage area shared between clones.
///
/// Clones share the same entry map, so two stores built over clones of one
/// `MemoryBackend` model two execution contexts over one storage area.
#[derive(Clone)]
pub struct MemoryBackend {
    id: String,
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryBackend {
    /// Create an empty storage area named `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of persisted entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}

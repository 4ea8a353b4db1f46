use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::backend::StorageBackend;
use crate::error::StoreError;

/// A storage area persisted as a single JSON object file.
///
/// Entries hold serialized text exactly as the store handed it over; the
/// file is read and rewritten on every operation. The file path doubles as
/// the storage area identity. A missing file is an empty area.
#[derive(Clone)]
pub struct FileBackend {
    id: String,
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            id: path.display().to_string(),
            path,
        }
    }

    fn load(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => {
                return Err(StoreError::Persistence {
                    op: "read",
                    key: key.to_string(),
                    message: err.to_string(),
                })
            }
        };

        serde_json::from_str(&text).map_err(|err| StoreError::Persistence {
            op: "read",
            key: key.to_string(),
            message: format!("storage file is not a JSON object: {err}"),
        })
    }

    fn persist(
        &self,
        op: &'static str,
        key: &str,
        entries: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(entries).map_err(|err| StoreError::Persistence {
            op,
            key: key.to_string(),
            message: err.to_string(),
        })?;

        fs::write(&self.path, text).map_err(|err| StoreError::Persistence {
            op,
            key: key.to_string(),
            message: err.to_string(),
        })
    }
}

impl StorageBackend for FileBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.load(key) {
            Ok(mut entries) => entries.remove(key),
            Err(err) => {
                warn!(key, error = %err, "failed to read storage file, treating entry as missing");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load(key)?;
        entries.insert(key.to_string(), value.to_string());
        self.persist("write", key, &entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load(key)?;
        if entries.remove(key).is_some() {
            self.persist("removal", key, &entries)?;
        }
        Ok(())
    }
}

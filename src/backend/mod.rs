//! Persistent storage backends.
//!
//! A backend is the host-supplied key/value store that outlives a single
//! session. Values cross this boundary as JSON text; a backend never needs
//! to understand what it holds.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::error::StoreError;

/// The host persistent store contract.
///
/// `id` names the storage area. Cross-context events carry the identity of
/// the area that changed, and a store only applies events whose identity
/// matches its own backend.
pub trait StorageBackend: Send + Sync {
    /// Identity of the storage area this backend reads and writes.
    fn id(&self) -> &str;

    /// Read the serialized entry for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Write the serialized entry for `key`, replacing any prior entry.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the entry for `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

//! # Tether
//!
//! Shared key/value state, mirrored into persistent storage.
//!
//! Tether keeps one in-memory mapping per [`SharedStore`], writes every
//! change through to a [`StorageBackend`], and notifies per-key watchers on
//! every update — including updates made by other execution contexts
//! sharing the same storage area.
//!
//! ## Store
//!
//! [`SharedStore`] owns the mapping. `set` writes through to the backend,
//! `init` loads a key from the backend once (the persisted value wins over
//! the supplied default), `clear` removes the key from both.
//!
//! ## Bindings
//!
//! [`use_shared_state`] binds a consumer to one key of the innermost
//! provider, established with [`SharedStore::provide`]:
//!
//! ```
//! use tether::{use_shared_state, MemoryBackend, SharedStore};
//!
//! let store = SharedStore::new(MemoryBackend::new("app"));
//! store.provide(|| {
//!     let theme = use_shared_state("theme", &"light".to_string());
//!     assert_eq!(theme.get().as_deref(), Some("light"));
//!
//!     theme.set(&"dark".to_string()).unwrap();
//!     assert_eq!(theme.get().as_deref(), Some("dark"));
//! });
//! ```
//!
//! ## Cross-context sync
//!
//! Stores sharing one storage area stay in sync over a
//! [`StorageEventBus`]: each store publishes its writes and applies
//! everyone else's, never hearing its own.

pub mod backend;
pub mod binding;
pub mod error;
pub mod store;
pub mod sync;

// Re-export main types for convenience
pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use binding::{use_shared_state, SharedValue};
pub use error::StoreError;
pub use store::{SharedStore, Subscription};
pub use sync::{StorageEvent, StorageEventBus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = SharedStore::new(MemoryBackend::new("smoke"));
        store.set("answer", &42).unwrap();
        assert_eq!(store.get::<i32>("answer"), Some(42));
    }
}

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::StoreError;
use crate::store::{SharedStore, Subscription};

/// A consumer's binding to one key of the current provider's store.
///
/// Built with [`use_shared_state`]. The default value is registered once,
/// when the binding is constructed; it is never re-applied afterwards, so a
/// value that is already live, or persisted, or updated by another context
/// always wins over the default.
pub struct SharedValue<T> {
    store: Option<SharedStore>,
    key: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> SharedValue<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// The key this binding reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the binding resolved a provider when it was built.
    pub fn is_attached(&self) -> bool {
        self.store.is_some()
    }

    /// Current value, or `None` when the key is uninitialized, cleared, or
    /// the binding was built outside a provider scope.
    pub fn get(&self) -> Option<T> {
        self.store.as_ref()?.get(&self.key)
    }

    /// Write a new value through to the store and its backend.
    ///
    /// A detached binding accepts the write and discards it.
    pub fn set(&self, value: &T) -> Result<(), StoreError> {
        match &self.store {
            Some(store) => store.set(&self.key, value),
            None => Ok(()),
        }
    }

    /// Remove the key from the store and its backend.
    pub fn clear(&self) -> Result<(), StoreError> {
        match &self.store {
            Some(store) => store.clear(&self.key),
            None => Ok(()),
        }
    }

    /// Watch this key for changes.
    ///
    /// The callback fires immediately with the current value and again on
    /// every change (`None` when the key is cleared, or when the live
    /// value stops decoding as `T`). Returns `None` for a detached
    /// binding; otherwise the subscription lasts until the guard drops.
    pub fn watch<F>(&self, callback: F) -> Option<Subscription>
    where
        F: Fn(Option<T>) + Send + Sync + 'static,
    {
        let store = self.store.as_ref()?;
        Some(store.watch(&self.key, move |value| {
            let decoded = value.and_then(|v| serde_json::from_value(v.clone()).ok());
            callback(decoded);
        }))
    }
}

/// Bind to `key` in the innermost provider's store.
///
/// Registers `default` for the key exactly once, at construction: a key
/// with a persisted entry keeps the persisted value, and an already-live
/// key keeps its current value. Re-binding later with a different default
/// has no effect on an initialized key.
///
/// Outside any [`SharedStore::provide`] scope the binding is inert — the
/// value is always `None` and the setter is a no-op — and a warning is
/// logged.
pub fn use_shared_state<T>(key: impl Into<String>, default: &T) -> SharedValue<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let key = key.into();
    let store = SharedStore::current();

    match &store {
        Some(store) => {
            if let Err(err) = store.init(&key, default) {
                warn!(key = %key, error = %err, "failed to register the default value");
            }
        }
        None => {
            warn!(key = %key, "use_shared_state called outside a provider scope; binding is inert");
        }
    }

    SharedValue {
        store,
        key,
        _value: PhantomData,
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::backend::StorageBackend;
use crate::error::StoreError;
use crate::store::scope;
use crate::sync::{StorageEvent, StorageEventBus};

type KeySubscriber = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

/// A shared key/value store mirrored into a persistent backend.
///
/// The store holds one in-memory mapping from string keys to decoded JSON
/// values. Writes replace the in-memory entry, notify that key's watchers,
/// and then mirror the JSON text into the backend. Reads never touch the
/// backend; keys are loaded from it once, through [`SharedStore::init`].
///
/// Clones share the same state. To expose a store to consumer bindings,
/// wrap the consuming code in [`SharedStore::provide`].
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn StorageBackend>,
    state: RwLock<HashMap<String, Value>>,
    subscribers: RwLock<HashMap<String, Vec<(usize, KeySubscriber)>>>,
    next_sub_id: AtomicUsize,
    bus: RwLock<Option<BusLink>>,
}

struct BusLink {
    bus: StorageEventBus,
    context_id: usize,
    listener_id: usize,
}

impl SharedStore {
    /// Create an empty store over the given backend.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend: Arc::new(backend),
                state: RwLock::new(HashMap::new()),
                subscribers: RwLock::new(HashMap::new()),
                next_sub_id: AtomicUsize::new(0),
                bus: RwLock::new(None),
            }),
        }
    }

    /// Identity of the storage area this store mirrors into.
    pub fn backend_id(&self) -> &str {
        self.inner.backend.id()
    }

    /// Run `f` with this store as the innermost provider on this thread.
    ///
    /// Bindings created inside `f` via [`use_shared_state`] resolve to this
    /// store. Scopes nest; the innermost one wins.
    ///
    /// [`use_shared_state`]: crate::binding::use_shared_state
    pub fn provide<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        scope::provide(self.clone(), f)
    }

    /// The innermost provider on this thread, if any.
    pub fn current() -> Option<SharedStore> {
        scope::current()
    }

    /// Current in-memory value for `key`, decoded as `T`.
    ///
    /// Returns `None` when the key was never initialized, was cleared, or
    /// does not decode as `T` (a mismatch logs a warning). Never touches
    /// the backend.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_raw(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key, error = %err, "in-memory value does not decode as the requested type");
                None
            }
        }
    }

    /// Current in-memory value for `key` as raw JSON.
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.inner.state.read().unwrap().get(key).cloned()
    }

    /// Whether `key` currently holds an in-memory value.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.state.read().unwrap().contains_key(key)
    }

    /// Write `value` for `key`, replacing any prior value.
    ///
    /// The in-memory entry is updated and watchers are notified before the
    /// backend write; a rejected write is returned to the caller but the
    /// in-memory update is not rolled back, so memory may run ahead of the
    /// persisted copy until the next successful write.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        let text = encoded.to_string();

        self.inner
            .state
            .write()
            .unwrap()
            .insert(key.to_string(), encoded.clone());
        self.notify(key, Some(&encoded));

        if let Err(err) = self.inner.backend.set(key, &text) {
            warn!(key, error = %err, "backend rejected write, persisted copy is stale");
            return Err(err);
        }

        self.publish(key, Some(text));
        Ok(())
    }

    /// Initialize `key` from the backend, falling back to `default`.
    ///
    /// A no-op while the key already holds an in-memory value. Otherwise
    /// the persisted entry wins when it exists and decodes; a missing
    /// entry, a JSON `null`, or a malformed payload resolves to `default`.
    /// Never writes to the backend.
    pub fn init<T: Serialize>(&self, key: &str, default: &T) -> Result<(), StoreError> {
        if self.contains(key) {
            return Ok(());
        }

        let resolved = match self.inner.backend.get(key) {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Null) => self.encode_default(key, default)?,
                Ok(value) => value,
                Err(source) => {
                    let err = StoreError::Deserialization {
                        key: key.to_string(),
                        source,
                    };
                    warn!(key, error = %err, "stored payload is malformed, using the default");
                    self.encode_default(key, default)?
                }
            },
            None => self.encode_default(key, default)?,
        };

        {
            let mut state = self.inner.state.write().unwrap();
            if state.contains_key(key) {
                return Ok(());
            }
            state.insert(key.to_string(), resolved.clone());
        }
        self.notify(key, Some(&resolved));
        Ok(())
    }

    /// Remove `key` from the store and from the backend.
    ///
    /// Watchers are notified with `None`. The backend removal error, if
    /// any, is returned after the in-memory entry is already gone.
    pub fn clear(&self, key: &str) -> Result<(), StoreError> {
        let removed = self.inner.state.write().unwrap().remove(key).is_some();
        if removed {
            self.notify(key, None);
        }

        if let Err(err) = self.inner.backend.remove(key) {
            warn!(key, error = %err, "backend rejected removal, persisted entry is stale");
            return Err(err);
        }

        self.publish(key, None);
        Ok(())
    }

    /// Watch one key for changes.
    ///
    /// The callback fires immediately with the current value, and again on
    /// every change to the key (`None` when it is cleared). Dropping the
    /// returned guard unsubscribes.
    pub fn watch<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        let id = self.inner.next_sub_id.fetch_add(1, Ordering::SeqCst);
        let callback: KeySubscriber = Arc::new(callback);

        self.inner
            .subscribers
            .write()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push((id, Arc::clone(&callback)));

        // Call immediately with the current value
        let current = self.get_raw(key);
        callback(current.as_ref());

        Subscription {
            key: key.to_string(),
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Apply a storage-change notification from another execution context.
    ///
    /// Events for a different storage area are ignored. The raw payload is
    /// decoded through the same JSON contract as local writes; a payload
    /// that fails to decode is logged and dropped rather than stored raw.
    pub fn apply_external(&self, event: &StorageEvent) {
        if event.store_id != self.inner.backend.id() {
            return;
        }

        match &event.new_value {
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(value) => {
                    self.inner
                        .state
                        .write()
                        .unwrap()
                        .insert(event.key.clone(), value.clone());
                    self.notify(&event.key, Some(&value));
                }
                Err(err) => {
                    warn!(key = %event.key, error = %err, "dropping external change with malformed payload");
                }
            },
            None => {
                let removed = self
                    .inner
                    .state
                    .write()
                    .unwrap()
                    .remove(&event.key)
                    .is_some();
                if removed {
                    self.notify(&event.key, None);
                }
            }
        }
    }

    /// Connect this store to a bus.
    ///
    /// Events published by sibling contexts are applied automatically via
    /// [`SharedStore::apply_external`]; this store's own writes are
    /// published to the bus but never delivered back to it. Connecting to
    /// a second bus replaces the first connection.
    pub fn connect(&self, bus: &StorageEventBus) {
        let context_id = bus.register_context();
        let weak = Arc::downgrade(&self.inner);
        let listener_id = bus.subscribe(context_id, move |event| {
            if let Some(inner) = weak.upgrade() {
                SharedStore { inner }.apply_external(event);
            }
        });

        let mut slot = self.inner.bus.write().unwrap();
        if let Some(old) = slot.take() {
            old.bus.unsubscribe(old.listener_id);
        }
        *slot = Some(BusLink {
            bus: bus.clone(),
            context_id,
            listener_id,
        });
    }

    fn publish(&self, key: &str, new_value: Option<String>) {
        let link = self.inner.bus.read().unwrap();
        if let Some(link) = link.as_ref() {
            link.bus.publish_from(
                link.context_id,
                &StorageEvent {
                    store_id: self.inner.backend.id().to_string(),
                    key: key.to_string(),
                    new_value,
                },
            );
        }
    }

    /// Notify all watchers of `key`. Callbacks run with no locks held.
    fn notify(&self, key: &str, value: Option<&Value>) {
        let callbacks: Vec<KeySubscriber> = {
            let subscribers = self.inner.subscribers.read().unwrap();
            subscribers
                .get(key)
                .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };

        for callback in callbacks {
            callback(value);
        }
    }

    fn encode_default<T: Serialize>(&self, key: &str, default: &T) -> Result<Value, StoreError> {
        serde_json::to_value(default).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Ok(slot) = self.bus.get_mut() {
            if let Some(link) = slot.take() {
                link.bus.unsubscribe(link.listener_id);
            }
        }
    }
}

/// RAII guard for per-key watchers.
pub struct Subscription {
    key: String,
    id: usize,
    inner: Weak<StoreInner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            if let Ok(mut subscribers) = inner.subscribers.write() {
                if let Some(list) = subscribers.get_mut(&self.key) {
                    list.retain(|(id, _)| *id != self.id);
                }
            }
        }
    }
}

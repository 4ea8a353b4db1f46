use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// A storage-change notification.
///
/// Pushed whenever some execution context modifies a storage area. A store
/// ignores events whose `store_id` does not match its own backend.
#[derive(Clone, Debug)]
pub struct StorageEvent {
    /// Identity of the storage area that changed.
    pub store_id: String,
    /// The key that changed.
    pub key: String,
    /// The new serialized payload, or `None` when the entry was removed.
    pub new_value: Option<String>,
}

type Listener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

struct Registration {
    listener_id: usize,
    context_id: usize,
    listener: Listener,
}

/// In-process fan-out of storage events.
///
/// Each connected store registers as a context; publishing on behalf of a
/// context delivers to every listener except that context's own.
#[derive(Clone, Default)]
pub struct StorageEventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicUsize,
    listeners: RwLock<Vec<Registration>>,
}

impl StorageEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every listener, as if a context outside this
    /// process had modified the storage area.
    pub fn publish(&self, event: &StorageEvent) {
        self.deliver(None, event);
    }

    /// Deliver an event to every listener except those of `origin`.
    pub(crate) fn publish_from(&self, origin: usize, event: &StorageEvent) {
        self.deliver(Some(origin), event);
    }

    fn deliver(&self, origin: Option<usize>, event: &StorageEvent) {
        // Clone the callbacks out so none run under the bus lock.
        let listeners: Vec<Listener> = {
            let registrations = self.inner.listeners.read().unwrap();
            registrations
                .iter()
                .filter(|r| origin != Some(r.context_id))
                .map(|r| Arc::clone(&r.listener))
                .collect()
        };

        for listener in listeners {
            listener(event);
        }
    }

    pub(crate) fn register_context(&self) -> usize {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn subscribe<F>(&self, context_id: usize, listener: F) -> usize
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let listener_id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.write().unwrap().push(Registration {
            listener_id,
            context_id,
            listener: Arc::new(listener),
        });
        listener_id
    }

    pub(crate) fn unsubscribe(&self, listener_id: usize) {
        self.inner
            .listeners
            .write()
            .unwrap()
            .retain(|r| r.listener_id != listener_id);
    }
}

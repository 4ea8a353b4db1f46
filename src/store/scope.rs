use std::cell::RefCell;

use crate::store::SharedStore;

// Thread-local stack of active providers. Nested scopes shadow outer ones.
thread_local! {
    static PROVIDER_STACK: RefCell<Vec<SharedStore>> = RefCell::new(vec![]);
}

pub(crate) fn provide<F, R>(store: SharedStore, f: F) -> R
where
    F: FnOnce() -> R,
{
    PROVIDER_STACK.with(|stack| {
        stack.borrow_mut().push(store);
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    PROVIDER_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

pub(crate) fn current() -> Option<SharedStore> {
    PROVIDER_STACK.with(|stack| stack.borrow().last().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn no_provider_outside_a_scope() {
        assert!(current().is_none());
    }

    #[test]
    fn innermost_provider_wins() {
        let outer = SharedStore::new(MemoryBackend::new("outer"));
        let inner = SharedStore::new(MemoryBackend::new("inner"));

        outer.provide(|| {
            assert_eq!(SharedStore::current().unwrap().backend_id(), "outer");

            inner.provide(|| {
                assert_eq!(SharedStore::current().unwrap().backend_id(), "inner");
            });

            assert_eq!(SharedStore::current().unwrap().backend_id(), "outer");
        });

        assert!(SharedStore::current().is_none());
    }

    #[test]
    fn scope_is_restored_after_a_panic() {
        let store = SharedStore::new(MemoryBackend::new("panicky"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.provide(|| panic!("boom"));
        }));

        assert!(result.is_err());
        assert!(SharedStore::current().is_none());
    }
}

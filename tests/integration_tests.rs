//! Integration tests for Tether

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tether::{
    use_shared_state, FileBackend, MemoryBackend, SharedStore, StorageBackend, StorageEvent,
    StorageEventBus,
};

#[test]
fn theme_scenario() {
    // Provider mounted over an empty storage area
    let backend = MemoryBackend::new("local");
    let store = SharedStore::new(backend.clone());

    store.provide(|| {
        // First consumer binds "theme" with default "light"
        let theme = use_shared_state("theme", &"light".to_string());
        assert_eq!(theme.get().as_deref(), Some("light"));

        // Consumer flips to "dark"; the store and the backend both see it
        theme.set(&"dark".to_string()).unwrap();
        assert_eq!(theme.get().as_deref(), Some("dark"));
        assert_eq!(backend.get("theme").as_deref(), Some("\"dark\""));
    });

    // A second, independently mounted consumer binds the same key with its
    // own default. The persisted value wins.
    let second_store = SharedStore::new(backend);
    second_store.provide(|| {
        let theme = use_shared_state("theme", &"light".to_string());
        assert_eq!(theme.get().as_deref(), Some("dark"));
    });
}

#[test]
fn round_trip_across_a_fresh_context() {
    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Profile {
        name: String,
        logins: u32,
        tags: Vec<String>,
        extra: HashMap<String, i64>,
    }

    let profile = Profile {
        name: "zoe".to_string(),
        logins: 3,
        tags: vec!["admin".to_string(), "beta".to_string()],
        extra: HashMap::from([("score".to_string(), -12)]),
    };

    let backend = MemoryBackend::new("local");

    let writer = SharedStore::new(backend.clone());
    writer.set("profile", &profile).unwrap();
    writer.set("pi", &3.25f64).unwrap();
    writer.set("greeting", "hello").unwrap();
    writer.set("sequence", &[1, 2, 3]).unwrap();

    // A fresh store over the same area initializes from persisted entries
    let reader = SharedStore::new(backend);
    let empty = Profile {
        name: String::new(),
        logins: 0,
        tags: vec![],
        extra: HashMap::new(),
    };
    reader.init("profile", &empty).unwrap();
    reader.init("pi", &0.0f64).unwrap();
    reader.init("greeting", &String::new()).unwrap();
    reader.init("sequence", &Vec::<i32>::new()).unwrap();

    assert_eq!(reader.get::<Profile>("profile"), Some(profile));
    assert_eq!(reader.get::<f64>("pi"), Some(3.25));
    assert_eq!(reader.get::<String>("greeting").as_deref(), Some("hello"));
    assert_eq!(reader.get::<Vec<i32>>("sequence"), Some(vec![1, 2, 3]));
}

#[test]
fn two_contexts_stay_in_sync_over_the_bus() {
    let backend = MemoryBackend::new("local");
    let bus = StorageEventBus::new();

    let tab_a = SharedStore::new(backend.clone());
    let tab_b = SharedStore::new(backend);
    tab_a.connect(&bus);
    tab_b.connect(&bus);

    tab_a.set("count", &1).unwrap();
    assert_eq!(tab_b.get::<i32>("count"), Some(1));

    tab_b.set("count", &2).unwrap();
    assert_eq!(tab_a.get::<i32>("count"), Some(2));

    tab_a.clear("count").unwrap();
    assert_eq!(tab_b.get::<i32>("count"), None);
}

#[test]
fn writer_does_not_hear_its_own_event() {
    let backend = MemoryBackend::new("local");
    let bus = StorageEventBus::new();

    let tab = SharedStore::new(backend);
    tab.connect(&bus);

    let notifications = Arc::new(AtomicUsize::new(0));
    let _guard = tab.watch("count", {
        let notifications = notifications.clone();
        move |_| {
            notifications.fetch_add(1, Ordering::SeqCst);
        }
    });

    // One immediate call from watch, one from the local write; a bus echo
    // would make it three.
    tab.set("count", &1).unwrap();
    assert_eq!(notifications.load(Ordering::SeqCst), 2);
}

#[test]
fn events_from_foreign_storage_areas_are_filtered() {
    let bus = StorageEventBus::new();
    let store = SharedStore::new(MemoryBackend::new("local"));
    store.connect(&bus);
    store.set("count", &1).unwrap();

    bus.publish(&StorageEvent {
        store_id: "session".to_string(),
        key: "count".to_string(),
        new_value: Some("99".to_string()),
    });
    assert_eq!(store.get::<i32>("count"), Some(1));

    bus.publish(&StorageEvent {
        store_id: "local".to_string(),
        key: "count".to_string(),
        new_value: Some("99".to_string()),
    });
    assert_eq!(store.get::<i32>("count"), Some(99));
}

#[test]
fn external_update_reaches_bound_consumers() {
    let bus = StorageEventBus::new();
    let store = SharedStore::new(MemoryBackend::new("local"));
    store.connect(&bus);

    store.provide(|| {
        let count = use_shared_state("count", &0i64);
        assert_eq!(count.get(), Some(0));

        // Another context persisted 7 and the host delivered the event
        bus.publish(&StorageEvent {
            store_id: "local".to_string(),
            key: "count".to_string(),
            new_value: Some("7".to_string()),
        });

        assert_eq!(count.get(), Some(7));
    });
}

#[test]
fn independent_stores_do_not_interfere() {
    let store_a = SharedStore::new(MemoryBackend::new("a"));
    let store_b = SharedStore::new(MemoryBackend::new("b"));

    store_a.set("k", &1).unwrap();
    store_b.set("k", &2).unwrap();

    assert_eq!(store_a.get::<i32>("k"), Some(1));
    assert_eq!(store_b.get::<i32>("k"), Some(2));
}

#[test]
fn state_survives_a_restart_with_a_file_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let store = SharedStore::new(FileBackend::new(&path));
        store.provide(|| {
            let theme = use_shared_state("theme", &"light".to_string());
            theme.set(&"dark".to_string()).unwrap();
        });
    }

    // A new process over the same file
    let store = SharedStore::new(FileBackend::new(&path));
    store.provide(|| {
        let theme = use_shared_state("theme", &"light".to_string());
        assert_eq!(theme.get().as_deref(), Some("dark"));
    });
}

#[test]
fn clear_then_get_misses() {
    let store = SharedStore::new(MemoryBackend::new("local"));

    store.set("k", &true).unwrap();
    store.clear("k").unwrap();

    assert_eq!(store.get::<bool>("k"), None);
}

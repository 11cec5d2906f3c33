use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::{sync::Mutex, time::timeout};

use super::*;

#[derive(Default)]
struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    fn with_entry(key: &str, value: &str) -> Arc<Self> {
        let store = Self::default();
        store
            .entries
            .try_lock()
            .expect("unshared store")
            .insert(key.to_string(), value.to_string());
        Arc::new(store)
    }

    async fn stored(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("store unavailable"));
        }
        self.writes
            .lock()
            .await
            .push((key.to_string(), value.to_string()));
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

async fn next_event(events: &mut broadcast::Receiver<CounterEvent>) -> CounterEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("event within deadline")
        .expect("event channel open")
}

#[tokio::test]
async fn value_is_unset_until_initialized() {
    let store = Arc::new(MemoryStore::default());
    let controller = CounterController::new(store);

    assert_eq!(controller.current(), None);
    assert_eq!(*controller.subscribe_value().borrow(), None);
}

#[tokio::test]
async fn initialize_defaults_to_zero_for_empty_store() {
    let store = Arc::new(MemoryStore::default());
    let controller = CounterController::new(store);

    let value = controller.initialize().await.expect("initialize");
    assert_eq!(value, 0);
    assert_eq!(controller.current(), Some(0));
}

#[tokio::test]
async fn initialize_returns_persisted_value() {
    let store = MemoryStore::with_entry(COUNTER_KEY, "41");
    let controller = CounterController::new(store);

    let value = controller.initialize().await.expect("initialize");
    assert_eq!(value, 41);
    assert_eq!(controller.current(), Some(41));
}

#[tokio::test]
async fn initialize_rejects_non_numeric_text() {
    let store = MemoryStore::with_entry(COUNTER_KEY, "not-a-number");
    let controller = CounterController::new(store);

    let err = controller.initialize().await.expect_err("invalid text");
    assert!(matches!(
        err,
        CounterError::InvalidPersistedValue { ref raw, .. } if raw == "not-a-number"
    ));
    assert_eq!(controller.current(), None);
}

#[tokio::test]
async fn increment_exposes_next_value_and_writes_it_once() {
    let store = Arc::new(MemoryStore::default());
    let controller = CounterController::new(store.clone());
    controller.initialize().await.expect("initialize");
    let mut events = controller.subscribe_events();

    controller.increment();

    assert_eq!(controller.current(), Some(1));
    assert!(matches!(
        next_event(&mut events).await,
        CounterEvent::Persisted { value: 1 }
    ));
    assert_eq!(store.stored(COUNTER_KEY).await.as_deref(), Some("1"));
    assert_eq!(
        store.writes().await,
        vec![(COUNTER_KEY.to_string(), "1".to_string())]
    );
}

#[tokio::test]
async fn increments_from_prepopulated_store() {
    let store = MemoryStore::with_entry(COUNTER_KEY, "41");
    let controller = CounterController::new(store.clone());
    controller.initialize().await.expect("initialize");
    let mut events = controller.subscribe_events();

    controller.increment();

    assert_eq!(controller.current(), Some(42));
    assert!(matches!(
        next_event(&mut events).await,
        CounterEvent::Persisted { value: 42 }
    ));
    assert_eq!(store.stored(COUNTER_KEY).await.as_deref(), Some("42"));
}

#[tokio::test]
async fn reset_is_idempotent() {
    let store = Arc::new(MemoryStore::default());
    let controller = CounterController::new(store.clone());
    controller.initialize().await.expect("initialize");
    let mut events = controller.subscribe_events();

    controller.increment();
    next_event(&mut events).await;

    controller.reset();
    next_event(&mut events).await;
    controller.reset();
    next_event(&mut events).await;

    assert_eq!(controller.current(), Some(0));
    assert_eq!(store.stored(COUNTER_KEY).await.as_deref(), Some("0"));
    assert_eq!(store.writes().await.len(), 3);
}

#[tokio::test]
async fn fresh_controller_round_trips_persisted_value() {
    let store = Arc::new(MemoryStore::default());

    let first = CounterController::new(store.clone());
    first.initialize().await.expect("initialize");
    let mut events = first.subscribe_events();
    first.increment();
    first.increment();
    next_event(&mut events).await;
    next_event(&mut events).await;

    let second = CounterController::new(store);
    let value = second.initialize().await.expect("initialize");
    assert_eq!(value, 2);
}

#[tokio::test]
async fn write_failure_keeps_optimistic_value_and_is_broadcast() {
    let store = Arc::new(MemoryStore::default());
    let controller = CounterController::new(store.clone());
    controller.initialize().await.expect("initialize");
    let mut events = controller.subscribe_events();

    store.fail_writes.store(true, Ordering::SeqCst);
    controller.increment();

    match next_event(&mut events).await {
        CounterEvent::WriteFailed { value, reason } => {
            assert_eq!(value, 1);
            assert!(reason.contains("store unavailable"));
        }
        other => panic!("expected write failure, got {other:?}"),
    }
    assert_eq!(controller.current(), Some(1));
    assert_eq!(store.stored(COUNTER_KEY).await, None);
}

#[tokio::test]
async fn walks_empty_store_through_increments_and_reset() {
    let store = Arc::new(MemoryStore::default());
    let controller = CounterController::new(store.clone());
    let mut events = controller.subscribe_events();

    assert_eq!(controller.initialize().await.expect("initialize"), 0);

    controller.increment();
    next_event(&mut events).await;
    assert_eq!(controller.current(), Some(1));
    assert_eq!(store.stored(COUNTER_KEY).await.as_deref(), Some("1"));

    controller.increment();
    next_event(&mut events).await;
    assert_eq!(controller.current(), Some(2));
    assert_eq!(store.stored(COUNTER_KEY).await.as_deref(), Some("2"));

    controller.reset();
    next_event(&mut events).await;
    assert_eq!(controller.current(), Some(0));
    assert_eq!(store.stored(COUNTER_KEY).await.as_deref(), Some("0"));
}

#[tokio::test]
async fn controllers_with_distinct_keys_do_not_interfere() {
    let store = Arc::new(MemoryStore::default());
    let left = CounterController::new_with_key(store.clone(), "LEFT");
    let right = CounterController::new_with_key(store.clone(), "RIGHT");
    left.initialize().await.expect("initialize");
    right.initialize().await.expect("initialize");
    let mut events = left.subscribe_events();

    left.increment();
    next_event(&mut events).await;

    assert_eq!(store.stored("LEFT").await.as_deref(), Some("1"));
    assert_eq!(store.stored("RIGHT").await, None);
    assert_eq!(right.current(), Some(0));
}

#[tokio::test]
async fn value_changes_reach_watch_subscribers() {
    let store = Arc::new(MemoryStore::default());
    let controller = CounterController::new(store);
    let mut value_rx = controller.subscribe_value();

    controller.initialize().await.expect("initialize");
    timeout(Duration::from_secs(2), value_rx.changed())
        .await
        .expect("change within deadline")
        .expect("watch open");
    assert_eq!(*value_rx.borrow_and_update(), Some(0));

    controller.increment();
    timeout(Duration::from_secs(2), value_rx.changed())
        .await
        .expect("change within deadline")
        .expect("watch open");
    assert_eq!(*value_rx.borrow_and_update(), Some(1));
}

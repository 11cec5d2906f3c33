use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Storage slot for the persisted counter.
pub const COUNTER_KEY: &str = "COUNT_ATOM";

/// Durable string-to-string mapping the counter is synchronized with.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("stored text {raw:?} under key {key:?} is not a non-negative integer")]
    InvalidPersistedValue {
        key: String,
        raw: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to read counter from store")]
    Store(#[source] anyhow::Error),
}

/// Outcome of a fire-and-forget durable write.
#[derive(Debug, Clone)]
pub enum CounterEvent {
    Persisted { value: u64 },
    WriteFailed { value: u64, reason: String },
}

/// Owns one integer value backed by a single store key. The value is exposed
/// through a watch cell that stays unset until [`initialize`] resolves;
/// mutations update the cell immediately and persist in the background.
///
/// [`initialize`]: CounterController::initialize
pub struct CounterController {
    store: Arc<dyn KeyValueStore>,
    key: String,
    value: watch::Sender<Option<u64>>,
    events: broadcast::Sender<CounterEvent>,
}

impl CounterController {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Arc<Self> {
        Self::new_with_key(store, COUNTER_KEY)
    }

    pub fn new_with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Arc<Self> {
        let (value, _) = watch::channel(None);
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            store,
            key: key.into(),
            value,
            events,
        })
    }

    /// Loads the persisted value and publishes it to subscribers. An absent
    /// slot loads as zero; non-numeric stored text is rejected and the
    /// reactive value stays unset.
    pub async fn initialize(&self) -> Result<u64, CounterError> {
        let stored = self
            .store
            .get(&self.key)
            .await
            .map_err(CounterError::Store)?;

        let value = match stored {
            None => 0,
            Some(raw) => {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|source| CounterError::InvalidPersistedValue {
                        key: self.key.clone(),
                        raw,
                        source,
                    })?
            }
        };

        self.value.send_replace(Some(value));
        Ok(value)
    }

    /// Bumps the exposed value without waiting for the durable write; the
    /// write's outcome arrives on the event channel.
    pub fn increment(&self) {
        let next = self.current().unwrap_or(0) + 1;
        self.value.send_replace(Some(next));
        self.persist_in_background(next);
    }

    pub fn reset(&self) {
        self.value.send_replace(Some(0));
        self.persist_in_background(0);
    }

    pub fn current(&self) -> Option<u64> {
        *self.value.borrow()
    }

    pub fn subscribe_value(&self) -> watch::Receiver<Option<u64>> {
        self.value.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CounterEvent> {
        self.events.subscribe()
    }

    fn persist_in_background(&self, value: u64) {
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            match store.set(&key, &value.to_string()).await {
                Ok(()) => {
                    let _ = events.send(CounterEvent::Persisted { value });
                }
                Err(err) => {
                    warn!(key = %key, value, "counter write failed: {err:#}");
                    let _ = events.send(CounterEvent::WriteFailed {
                        value,
                        reason: format!("{err:#}"),
                    });
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

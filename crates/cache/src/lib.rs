//! Key-addressed query cache shared by the admin views.
//!
//! Each key holds the last successfully fetched value for one resource list.
//! Mutations call [`QueryCache::invalidate`], which marks the entry stale and
//! tells subscribers; the next [`QueryCache::fetch`] for that key goes back to
//! the server. Values are replaced, never merged.

use std::{
    any::Any,
    collections::HashMap,
    future::Future,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

const EVENT_BUFFER: usize = 64;

/// Notification published on every state change of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The entry was marked stale and should be fetched again.
    Invalidated { key: String },
    /// A fetch stored a new value for the entry.
    Updated { key: String },
}

/// Freshness information about a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStatus {
    pub stale: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

type CachedValue = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Slot {
    value: Option<CachedValue>,
    fetched_at: Option<DateTime<Utc>>,
    /// Ticket handed to the most recently scheduled fetch.
    scheduled: u64,
    /// Ticket of the fetch whose value is stored.
    stored: u64,
    /// Fetches with a ticket at or below this value started before the last invalidation.
    invalidated_through: u64,
    stale: bool,
}

impl Slot {
    fn fresh_value(&self) -> Option<&CachedValue> {
        if self.stale {
            None
        } else {
            self.value.as_ref()
        }
    }
}

#[derive(Clone)]
pub struct QueryCache {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Returns the cached value for `key` when fresh, otherwise runs `fetch`.
    ///
    /// A fetch result is stored only if no later-scheduled fetch for the same
    /// key has been stored already; the caller always receives the value the
    /// cache holds afterwards. On failure the previous value is kept and the
    /// error is returned unchanged.
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ticket = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(key.to_string()).or_default();
            if let Some(value) = slot.fresh_value() {
                match value.clone().downcast::<T>() {
                    Ok(value) => return Ok(value),
                    Err(_) => warn!(stage = "cache", key, "cached value has unexpected type"),
                }
            }
            slot.scheduled += 1;
            slot.scheduled
        };

        debug!(stage = "cache", key, ticket, "fetching");
        let fetched = fetch().await?;
        let fetched: Arc<T> = Arc::new(fetched);

        let (result, updated) = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(key.to_string()).or_default();
            if ticket > slot.stored {
                slot.value = Some(fetched.clone() as CachedValue);
                slot.stored = ticket;
                slot.fetched_at = Some(Utc::now());
                slot.stale = ticket <= slot.invalidated_through;
                (fetched, true)
            } else {
                debug!(stage = "cache", key, ticket, stored = slot.stored, "discarding superseded response");
                let current = slot
                    .value
                    .clone()
                    .and_then(|value| value.downcast::<T>().ok())
                    .unwrap_or(fetched);
                (current, false)
            }
        };

        if updated {
            self.publish(CacheEvent::Updated {
                key: key.to_string(),
            });
        }
        Ok(result)
    }

    /// Returns the last stored value regardless of freshness.
    pub async fn read<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let slots = self.slots.lock().await;
        slots
            .get(key)
            .and_then(|slot| slot.value.clone())
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Marks `key` stale so the next fetch goes to the server, and notifies subscribers.
    pub async fn invalidate(&self, key: &str) {
        {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(key.to_string()).or_default();
            slot.stale = true;
            slot.invalidated_through = slot.scheduled;
        }
        debug!(stage = "cache", key, "invalidated");
        self.publish(CacheEvent::Invalidated {
            key: key.to_string(),
        });
    }

    pub async fn status(&self, key: &str) -> Option<EntryStatus> {
        let slots = self.slots.lock().await;
        slots.get(key).map(|slot| EntryStatus {
            stale: slot.stale || slot.value.is_none(),
            fetched_at: slot.fetched_at,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: CacheEvent) {
        // No receivers simply means no view is mounted yet.
        if self.events.send(event).is_err() {
            debug!(stage = "cache", "no cache subscribers");
        }
    }
}

//! Ordered, failure-isolating listener dispatch

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::{CacheEntryEvent, CacheEntryEventListener, EventType};
use crate::error::ListenerError;

/// Handle for removing a listener registered at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type SharedListener<K, V> = Arc<dyn CacheEntryEventListener<K, V>>;

/// Delivers events to listeners in registration order
pub struct EventDispatcher<K, V> {
    cache_name: Arc<str>,
    listeners: RwLock<Vec<(ListenerId, SharedListener<K, V>)>>,
    next_id: AtomicU64,
}

impl<K, V> EventDispatcher<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Dispatcher for the named cache
    pub fn new(cache_name: Arc<str>) -> Self {
        Self { cache_name, listeners: RwLock::new(Vec::new()), next_id: AtomicU64::new(0) }
    }

    /// Append a listener
    pub fn register(&self, listener: SharedListener<K, V>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener; `false` if the id is unknown
    pub fn deregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Build and deliver an event, cloning values only if someone listens
    ///
    /// Returns the number of listeners that failed.
    pub fn notify(
        &self,
        event_type: EventType,
        key: &K,
        old_value: Option<&V>,
        new_value: Option<&V>,
    ) -> usize {
        let listeners = self.snapshot();
        if listeners.is_empty() {
            return 0;
        }

        let event = CacheEntryEvent {
            key: key.clone(),
            old_value: old_value.cloned(),
            new_value: new_value.cloned(),
            event_type,
            cache_name: Arc::clone(&self.cache_name),
        };
        self.deliver(&listeners, &event)
    }

    // Listeners run without the registry lock held, so a listener may
    // register or deregister others.
    fn snapshot(&self) -> Vec<SharedListener<K, V>> {
        self.listeners.read().iter().map(|(_, listener)| Arc::clone(listener)).collect()
    }

    fn deliver(&self, listeners: &[SharedListener<K, V>], event: &CacheEntryEvent<K, V>) -> usize {
        let mut failures = 0;

        for listener in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_event(event)))
                .unwrap_or_else(|payload| Err(ListenerError::Panicked(panic_message(&*payload))));

            if let Err(error) = result {
                failures += 1;
                warn!(
                    cache = %self.cache_name,
                    listener = listener.name(),
                    event = %event.event_type,
                    error = %error,
                    "Event listener failed"
                );
            }
        }

        failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Shared test helpers for `memcache-core` integration tests.
//!
//! Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use memcache_core::{
    CacheConfiguration, CacheConfigurationBuilder, CacheEntryEvent, CacheEntryEventListener,
    EventType, EvictionPolicy, ExpirationConfiguration, ListenerError, ListenerRegistration,
};
use parking_lot::Mutex;

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Builder preset with the given name, policy and capacity, never expiring
pub fn builder(name: &str, policy: EvictionPolicy, capacity: usize) -> CacheConfigurationBuilder {
    CacheConfiguration::builder()
        .cache_name(name)
        .max_entries(capacity)
        .eviction_policy(policy)
        .expiration(ExpirationConfiguration::never())
}

/// Complete configuration with a time-to-live
pub fn ttl_config(name: &str, ttl: Duration) -> CacheConfiguration {
    builder(name, EvictionPolicy::LRU, 16)
        .expiration(ExpirationConfiguration::lifespan(ttl))
        .build()
        .expect("valid configuration")
}

/// Listener recording `(event type, key, old, new)` tuples
pub struct EventLog<K, V> {
    events: Mutex<Vec<CacheEntryEvent<K, V>>>,
}

impl<K, V> EventLog<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()) })
    }

    /// Registration suitable for a configuration builder
    pub fn registration(self: &Arc<Self>) -> ListenerRegistration {
        ListenerRegistration::new::<K, V, Self>(Arc::clone(self))
    }

    pub fn events(&self) -> Vec<CacheEntryEvent<K, V>> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<(EventType, K)> {
        self.events.lock().iter().map(|e| (e.event_type, e.key.clone())).collect()
    }

    pub fn count(&self, kind: EventType) -> usize {
        self.events.lock().iter().filter(|e| e.event_type == kind).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl<K, V> CacheEntryEventListener<K, V> for EventLog<K, V>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn on_event(&self, event: &CacheEntryEvent<K, V>) -> Result<(), ListenerError> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "event-log"
    }
}

//! Per-cache engine: bounded store, eviction, expiration, events, persistence
//!
//! One `parking_lot::Mutex` guards the store and the eviction order
//! together, so every per-key sequence (expire check, store mutation,
//! eviction bookkeeping, event dispatch, write-through) is atomic. Listeners
//! and bridges run under that lock and must not call back into the same
//! cache.
//!
//! Write-through is synchronous: memory is committed first, listeners are
//! notified, then the bridge is called. A bridge failure never rolls back
//! the memory change and is reported through the returned [`Outcome`].

mod entry;
mod outcome;

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

pub use entry::CacheEntry;
use memcache_common::{Clock, ComponentHealth, SystemClock};
pub use outcome::Outcome;
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::config::CacheConfiguration;
use crate::error::{CacheError, CacheResult, PersistenceError};
use crate::events::{CacheEntryEventListener, EventDispatcher, EventType, ListenerId};
use crate::eviction::{strategy_for, EvictionStrategy};
use crate::expiration::ExpirationTracker;
use crate::persistence::PersistentStoreBridge;
use crate::stats::{CacheStats, MetricsCollector};

/// Bounds required of cache keys
pub trait CacheKey: Eq + Hash + Clone + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Eq + Hash + Clone + Send + Sync + 'static {}

/// Bounds required of cache values
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + 'static {}

/// First persistence failure seen during one operation
type Degradation = Option<PersistenceError>;

struct EngineState<K, V> {
    entries: HashMap<K, CacheEntry<K, V>>,
    eviction: Box<dyn EvictionStrategy<K>>,
    closed: bool,
}

struct Persistence<K, V> {
    bridge: Arc<dyn PersistentStoreBridge<K, V>>,
    read_through: bool,
    flush_on_shutdown: bool,
}

/// A single named cache bound to concrete key and value types
pub struct CacheEngine<K, V> {
    name: Arc<str>,
    configuration: CacheConfiguration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    expiration: ExpirationTracker,
    dispatcher: EventDispatcher<K, V>,
    persistence: Option<Persistence<K, V>>,
    metrics: MetricsCollector,
    state: Mutex<EngineState<K, V>>,
}

impl<K, V> CacheEngine<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    /// Create an engine using the system clock
    ///
    /// # Errors
    /// Returns `CacheError::TypeMismatch` when the configured persistent
    /// store was built for other key/value types.
    pub fn new(configuration: CacheConfiguration) -> CacheResult<Self> {
        Self::with_clock(configuration, Arc::new(SystemClock))
    }

    /// Create an engine reading time from `clock`
    ///
    /// # Errors
    /// Returns `CacheError::TypeMismatch` when the configured persistent
    /// store was built for other key/value types.
    pub fn with_clock(configuration: CacheConfiguration, clock: Arc<dyn Clock>) -> CacheResult<Self> {
        let name = configuration.shared_name();

        let persistence = match configuration.persistent_store() {
            Some(store) => {
                let bridge = store.bridge::<K, V>().ok_or_else(|| {
                    let (key_type, value_type) = store.types();
                    CacheError::TypeMismatch {
                        cache: name.to_string(),
                        bound: format!("<{key_type}, {value_type}>"),
                        requested: type_pair::<K, V>(),
                    }
                })?;
                Some(Persistence {
                    bridge,
                    read_through: store.read_through(),
                    flush_on_shutdown: store.flush_on_shutdown(),
                })
            }
            None => None,
        };

        let dispatcher = EventDispatcher::new(Arc::clone(&name));
        for registration in configuration.listeners() {
            match registration.downcast::<K, V>() {
                Some(listener) => {
                    dispatcher.register(listener);
                }
                None => {
                    let (key_type, value_type) = registration.types();
                    debug!(
                        cache = %name,
                        listener = registration.name(),
                        key_type,
                        value_type,
                        "Skipping listener registered for other key/value types"
                    );
                }
            }
        }

        let memory = configuration.memory_store();
        let state = EngineState {
            entries: HashMap::with_capacity(memory.allocation_hint()),
            eviction: strategy_for(configuration.eviction_policy()),
            closed: false,
        };

        debug!(
            cache = %name,
            capacity = memory.max_entries,
            policy = %configuration.eviction_policy(),
            persistent = persistence.is_some(),
            "Cache engine created"
        );

        Ok(Self {
            capacity: memory.max_entries,
            expiration: ExpirationTracker::new(*configuration.expiration()),
            name,
            configuration,
            clock,
            dispatcher,
            persistence,
            metrics: MetricsCollector::new(),
            state: Mutex::new(state),
        })
    }

    /// Read a value
    ///
    /// An expired entry is removed (emitting `Expired`) and treated as a
    /// miss. On a miss the persistent tier is consulted when read-through is
    /// enabled; a loaded value is inserted and emits `Created`.
    pub fn get(&self, key: &K) -> CacheResult<Outcome<Option<V>>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "get")?;

        let now = self.clock.now();
        let mut degraded = None;
        self.expire_if_due(state, key, now);

        if let Some(value) = self.read_live(state, key, now) {
            self.metrics.record_hit();
            return Ok(Outcome::new(Some(value), degraded));
        }

        let value = self.load_through(state, key, now, &mut degraded);
        if value.is_some() {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        Ok(Outcome::new(value, degraded))
    }

    /// Insert or overwrite a value, returning the previous live value
    ///
    /// Inserting into a full cache evicts one victim first.
    pub fn put(&self, key: K, value: V) -> CacheResult<Outcome<Option<V>>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "put")?;

        let now = self.clock.now();
        let mut degraded = None;
        self.expire_if_due(state, &key, now);

        let previous = if state.entries.contains_key(&key) {
            self.overwrite(state, &key, value, now, &mut degraded)
        } else {
            self.insert_through(state, key, value, now, &mut degraded);
            None
        };

        Ok(Outcome::new(previous, degraded))
    }

    /// Insert only if no live value exists, returning the existing value
    pub fn put_if_absent(&self, key: K, value: V) -> CacheResult<Outcome<Option<V>>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "put_if_absent")?;

        let now = self.clock.now();
        let mut degraded = None;
        self.expire_if_due(state, &key, now);

        if let Some(existing) = state.entries.get(&key) {
            return Ok(Outcome::new(Some(existing.value().clone()), degraded));
        }

        self.insert_through(state, key, value, now, &mut degraded);
        Ok(Outcome::new(None, degraded))
    }

    /// Overwrite only if a live value exists, returning the previous value
    pub fn replace(&self, key: &K, value: V) -> CacheResult<Outcome<Option<V>>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "replace")?;

        let now = self.clock.now();
        let mut degraded = None;
        self.expire_if_due(state, key, now);

        let previous = if state.entries.contains_key(key) {
            self.overwrite(state, key, value, now, &mut degraded)
        } else {
            None
        };
        Ok(Outcome::new(previous, degraded))
    }

    /// Remove a value
    ///
    /// The removal is propagated to the persistent tier even when the key
    /// was not in memory. Removing an absent key emits no event.
    pub fn remove(&self, key: &K) -> CacheResult<Outcome<Option<V>>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "remove")?;

        let now = self.clock.now();
        let mut degraded = None;

        self.expire_if_due(state, key, now);

        let removed = self.remove_live(state, key);
        self.delete_through(key, &mut degraded);
        Ok(Outcome::new(removed, degraded))
    }

    /// Drop every entry without emitting events or touching persistence
    pub fn clear(&self) -> CacheResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "clear")?;

        let cleared = state.entries.len();
        state.entries.clear();
        state.eviction.clear();

        debug!(cache = %self.name, cleared, "Cache cleared");
        Ok(())
    }

    /// Whether a live value exists, without counting as an access
    pub fn contains_key(&self, key: &K) -> CacheResult<bool> {
        let guard = self.state.lock();
        self.ensure_open(&guard, "contains_key")?;

        let now = self.clock.now();
        Ok(guard.entries.get(key).is_some_and(|entry| !self.expiration.is_expired(entry, now)))
    }

    /// Current value of `key`, or `compute(key)` inserted as a new entry
    ///
    /// A miss consults the persistent tier first when read-through is
    /// enabled. `compute` runs under the cache lock and must not use this
    /// cache.
    pub fn compute_if_absent<F>(&self, key: K, compute: F) -> CacheResult<Outcome<V>>
    where
        F: FnOnce(&K) -> V,
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "compute_if_absent")?;

        let now = self.clock.now();
        let mut degraded = None;
        self.expire_if_due(state, &key, now);

        if let Some(value) = self.read_live(state, &key, now) {
            self.metrics.record_hit();
            return Ok(Outcome::new(value, degraded));
        }

        if let Some(value) = self.load_through(state, &key, now, &mut degraded) {
            self.metrics.record_hit();
            return Ok(Outcome::new(value, degraded));
        }

        self.metrics.record_miss();
        let value = compute(&key);
        self.insert_through(state, key, value.clone(), now, &mut degraded);
        Ok(Outcome::new(value, degraded))
    }

    /// Remove every expired entry, emitting `Expired` for each
    ///
    /// Returns the number of entries removed. A closed cache purges nothing.
    pub fn purge_expired(&self) -> usize {
        if !self.expiration.is_enabled() {
            return 0;
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return 0;
        }

        let now = self.clock.now();
        let expired: Vec<K> = state
            .entries
            .values()
            .filter(|entry| self.expiration.is_expired(entry, now))
            .map(|entry| entry.key().clone())
            .collect();

        for key in &expired {
            self.expire_if_due(state, key, now);
        }

        if !expired.is_empty() {
            debug!(cache = %self.name, purged = expired.len(), "Purged expired entries");
        }
        expired.len()
    }

    /// Store every live entry in the persistent tier
    ///
    /// Returns the number of entries stored. Without a persistent tier this
    /// is a no-op.
    pub fn flush(&self) -> CacheResult<Outcome<usize>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "flush")?;

        Ok(self.flush_entries(state))
    }

    /// Close the cache, flushing first when configured to
    ///
    /// Every later operation fails with `CacheError::IllegalState`. Closing
    /// an already closed cache does nothing.
    pub fn close(&self) -> Outcome<usize> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Outcome::complete(0);
        }
        state.closed = true;

        let flushed = match &self.persistence {
            Some(persistence) if persistence.flush_on_shutdown => self.flush_entries(state),
            _ => Outcome::complete(0),
        };

        state.entries.clear();
        state.eviction.clear();

        debug!(cache = %self.name, flushed = *flushed.value(), "Cache engine closed");
        flushed
    }

    /// Add a listener at runtime
    pub fn register_listener<L>(&self, listener: Arc<L>) -> ListenerId
    where
        L: CacheEntryEventListener<K, V> + 'static,
    {
        self.dispatcher.register(listener)
    }

    /// Remove a listener added with [`register_listener`](Self::register_listener)
    pub fn deregister_listener(&self, id: ListenerId) -> bool {
        self.dispatcher.deregister(id)
    }

    /// Cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration the engine was created from
    pub fn configuration(&self) -> &CacheConfiguration {
        &self.configuration
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CacheStats {
        let size = self.state.lock().entries.len();
        self.metrics.snapshot(size, self.capacity)
    }

    /// Health of this cache as a manager component
    pub fn health(&self) -> ComponentHealth {
        if self.is_closed() {
            ComponentHealth::unhealthy(&*self.name, "cache is closed")
        } else {
            ComponentHealth::healthy(&*self.name)
        }
    }

    fn ensure_open(&self, state: &EngineState<K, V>, operation: &'static str) -> CacheResult<()> {
        if state.closed {
            return Err(CacheError::illegal_state(
                operation,
                format!("cache '{}' is closed", self.name),
            ));
        }
        Ok(())
    }

    /// Value of a live entry, recording the access
    fn read_live(&self, state: &mut EngineState<K, V>, key: &K, now: Instant) -> Option<V> {
        let entry = state.entries.get_mut(key)?;
        entry.record_access(now);
        self.expiration.refresh(entry);
        state.eviction.on_access(key);
        Some(entry.value().clone())
    }

    /// Remove `key` from memory if its deadline has passed
    ///
    /// The persistent tier keeps the value, so read-through can reload it.
    fn expire_if_due(&self, state: &mut EngineState<K, V>, key: &K, now: Instant) {
        let due = state.entries.get(key).is_some_and(|entry| self.expiration.is_expired(entry, now));
        if !due {
            return;
        }

        if let Some(entry) = Self::detach(state, key) {
            self.metrics.record_expiration();
            trace!(cache = %self.name, "Entry expired");
            self.notify(EventType::Expired, key, Some(entry.value()), None);
        }
    }

    /// Remove a live entry on caller request, emitting `Removed`
    fn remove_live(&self, state: &mut EngineState<K, V>, key: &K) -> Option<V> {
        let entry = Self::detach(state, key)?;
        self.metrics.record_removal();
        self.notify(EventType::Removed, key, Some(entry.value()), None);
        Some(entry.into_value())
    }

    /// Replace the value of an existing entry and write it through
    fn overwrite(
        &self,
        state: &mut EngineState<K, V>,
        key: &K,
        value: V,
        now: Instant,
        degraded: &mut Degradation,
    ) -> Option<V> {
        let entry = state.entries.get_mut(key)?;
        let previous = entry.record_write(value, now);
        self.expiration.refresh(entry);
        state.eviction.on_update(key);
        self.metrics.record_update();

        self.notify(EventType::Updated, key, Some(&previous), Some(entry.value()));
        self.write_through(key, entry.value(), degraded);
        Some(previous)
    }

    /// Insert a caller-supplied value and write it through
    fn insert_through(
        &self,
        state: &mut EngineState<K, V>,
        key: K,
        value: V,
        now: Instant,
        degraded: &mut Degradation,
    ) {
        self.metrics.record_put();
        let entry = self.insert_new(state, key, value, now);
        self.write_through(entry.key(), entry.value(), degraded);
    }

    /// Insert a new key, evicting first if the store is full
    fn insert_new<'s>(
        &self,
        state: &'s mut EngineState<K, V>,
        key: K,
        value: V,
        now: Instant,
    ) -> &'s CacheEntry<K, V> {
        self.make_room(state, now);

        let mut entry = CacheEntry::new(key.clone(), value, now);
        self.expiration.refresh(&mut entry);
        state.eviction.on_insert(&key);

        let entry = state.entries.entry(key).or_insert(entry);
        self.notify(EventType::Created, entry.key(), None, Some(entry.value()));
        entry
    }

    /// Evict until one more entry fits
    fn make_room(&self, state: &mut EngineState<K, V>, now: Instant) {
        while state.entries.len() >= self.capacity {
            let Some(victim) = state.eviction.select_victim() else {
                error!(
                    cache = %self.name,
                    size = state.entries.len(),
                    "Eviction order is empty while the store is full"
                );
                break;
            };

            let Some(entry) = Self::detach(state, &victim) else {
                warn!(cache = %self.name, "Dropping eviction node without a stored entry");
                state.eviction.on_remove(&victim);
                continue;
            };

            if self.expiration.is_expired(&entry, now) {
                self.metrics.record_expiration();
                self.notify(EventType::Expired, &victim, Some(entry.value()), None);
            } else {
                self.metrics.record_eviction();
                trace!(cache = %self.name, policy = %state.eviction.policy(), "Entry evicted");
                self.notify(EventType::Evicted, &victim, Some(entry.value()), None);
            }
        }
    }

    /// Read-through on a miss, inserting a loaded value
    fn load_through(
        &self,
        state: &mut EngineState<K, V>,
        key: &K,
        now: Instant,
        degraded: &mut Degradation,
    ) -> Option<V> {
        let persistence = self.persistence.as_ref().filter(|p| p.read_through)?;

        match persistence.bridge.load(key) {
            Ok(Some(value)) => {
                let entry = self.insert_new(state, key.clone(), value, now);
                Some(entry.value().clone())
            }
            Ok(None) => None,
            Err(error) => {
                self.record_persistence_failure(error, degraded);
                None
            }
        }
    }

    fn flush_entries(&self, state: &mut EngineState<K, V>) -> Outcome<usize> {
        let Some(persistence) = &self.persistence else {
            return Outcome::complete(0);
        };

        let now = self.clock.now();
        let mut degraded = None;
        let mut stored = 0;

        for entry in state.entries.values() {
            if self.expiration.is_expired(entry, now) {
                continue;
            }
            match persistence.bridge.store(entry.key(), entry.value()) {
                Ok(()) => stored += 1,
                Err(error) => self.record_persistence_failure(error, &mut degraded),
            }
        }

        debug!(cache = %self.name, stored, "Flushed entries to persistent store");
        Outcome::new(stored, degraded)
    }

    fn write_through(&self, key: &K, value: &V, degraded: &mut Degradation) {
        if let Some(persistence) = &self.persistence {
            if let Err(error) = persistence.bridge.store(key, value) {
                self.record_persistence_failure(error, degraded);
            }
        }
    }

    fn delete_through(&self, key: &K, degraded: &mut Degradation) {
        if let Some(persistence) = &self.persistence {
            if let Err(error) = persistence.bridge.delete(key) {
                self.record_persistence_failure(error, degraded);
            }
        }
    }

    fn record_persistence_failure(&self, error: PersistenceError, degraded: &mut Degradation) {
        self.metrics.record_persistence_failure();
        warn!(
            cache = %self.name,
            operation = %error.operation(),
            error = %error,
            "Persistent store call failed"
        );
        degraded.get_or_insert(error);
    }

    fn notify(&self, event_type: EventType, key: &K, old_value: Option<&V>, new_value: Option<&V>) {
        let failures = self.dispatcher.notify(event_type, key, old_value, new_value);
        self.metrics.record_listener_failures(failures);
    }

    /// Remove an entry from the store and the eviction order together
    fn detach(state: &mut EngineState<K, V>, key: &K) -> Option<CacheEntry<K, V>> {
        let entry = state.entries.remove(key)?;
        state.eviction.on_remove(key);
        Some(entry)
    }
}

impl<K, V> CacheEngine<K, V>
where
    K: CacheKey,
    V: CacheValue + PartialEq,
{
    /// Overwrite only if the current live value equals `expected`
    pub fn replace_if(&self, key: &K, expected: &V, value: V) -> CacheResult<Outcome<bool>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "replace_if")?;

        let now = self.clock.now();
        let mut degraded = None;
        self.expire_if_due(state, key, now);

        let matches = state.entries.get(key).is_some_and(|entry| entry.value() == expected);
        if matches {
            self.overwrite(state, key, value, now, &mut degraded);
        }
        Ok(Outcome::new(matches, degraded))
    }

    /// Remove only if the current live value equals `expected`
    pub fn remove_if(&self, key: &K, expected: &V) -> CacheResult<Outcome<bool>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.ensure_open(state, "remove_if")?;

        let now = self.clock.now();
        let mut degraded = None;
        self.expire_if_due(state, key, now);

        let matches = state.entries.get(key).is_some_and(|entry| entry.value() == expected);
        if matches {
            self.remove_live(state, key);
            self.delete_through(key, &mut degraded);
        }
        Ok(Outcome::new(matches, degraded))
    }
}

impl<K, V> fmt::Debug for CacheEngine<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("policy", &self.configuration.eviction_policy())
            .field("persistent", &self.persistence.is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) fn type_pair<K, V>() -> String {
    format!("<{}, {}>", type_name::<K>(), type_name::<V>())
}

#[cfg(test)]
mod tests {
    //! Unit tests for engine.
    use std::time::Duration;

    use memcache_common::MockClock;
    use parking_lot::Mutex as TestMutex;

    use super::*;
    use crate::config::{EvictionPolicy, ExpirationConfiguration};
    use crate::error::ListenerError;
    use crate::events::{listener_fn, CacheEntryEvent};
    use crate::persistence::{InMemoryStore, PersistentStoreConfiguration};

    type Log = Arc<TestMutex<Vec<(EventType, &'static str)>>>;

    fn recording(log: &Log) -> crate::events::ListenerRegistration {
        let log = Arc::clone(log);
        listener_fn("recorder", move |event: &CacheEntryEvent<&'static str, u32>| {
            log.lock().push((event.event_type, event.key));
            Ok(())
        })
    }

    fn engine(
        policy: EvictionPolicy,
        capacity: usize,
        expiration: ExpirationConfiguration,
    ) -> (CacheEngine<&'static str, u32>, MockClock, Log) {
        let log: Log = Arc::new(TestMutex::new(Vec::new()));
        let config = CacheConfiguration::builder()
            .cache_name("test")
            .max_entries(capacity)
            .eviction_policy(policy)
            .expiration(expiration)
            .listener(recording(&log))
            .build()
            .expect("valid configuration");
        let clock = MockClock::new();
        let engine =
            CacheEngine::with_clock(config, Arc::new(clock.clone())).expect("no persistent store");
        (engine, clock, log)
    }

    fn persistent_engine(
        store: &Arc<InMemoryStore<&'static str, u32>>,
        expiration: ExpirationConfiguration,
    ) -> (CacheEngine<&'static str, u32>, MockClock) {
        let config = CacheConfiguration::builder()
            .cache_name("persistent")
            .max_entries(2)
            .eviction_policy(EvictionPolicy::LRU)
            .expiration(expiration)
            .persistent_store(PersistentStoreConfiguration::new(Arc::clone(store)))
            .build()
            .expect("valid configuration");
        let clock = MockClock::new();
        let engine =
            CacheEngine::with_clock(config, Arc::new(clock.clone())).expect("bridge types match");
        (engine, clock)
    }

    /// Validates overwrite semantics.
    ///
    /// Assertions:
    /// - Confirms the first put returns `None` and the second the old value.
    /// - Confirms CREATED then UPDATED are emitted.
    /// - Confirms the latest value is read back.
    #[test]
    fn test_put_then_overwrite() {
        let (engine, _, log) = engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::never());

        assert_eq!(engine.put("a", 1).expect("open").into_value(), None);
        assert_eq!(engine.put("a", 2).expect("open").into_value(), Some(1));
        assert_eq!(engine.get(&"a").expect("open").into_value(), Some(2));

        assert_eq!(*log.lock(), vec![(EventType::Created, "a"), (EventType::Updated, "a")]);

        let stats = engine.stats();
        assert_eq!((stats.puts, stats.updates, stats.hits), (1, 1, 1));
    }

    /// Validates removal emits REMOVED only for present keys.
    #[test]
    fn test_remove_present_and_absent() {
        let (engine, _, log) = engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::never());
        engine.put("a", 1).expect("open").into_value();

        assert_eq!(engine.remove(&"a").expect("open").into_value(), Some(1));
        assert_eq!(engine.remove(&"a").expect("open").into_value(), None);
        assert_eq!(engine.get(&"a").expect("open").into_value(), None);

        assert_eq!(*log.lock(), vec![(EventType::Created, "a"), (EventType::Removed, "a")]);
        assert_eq!(engine.stats().misses, 1);
    }

    /// Validates a full cache evicts before inserting.
    ///
    /// Assertions:
    /// - Confirms the size never exceeds capacity.
    /// - Confirms EVICTED precedes CREATED of the new key.
    #[test]
    fn test_capacity_enforced_with_eviction_event() {
        let (engine, _, log) = engine(EvictionPolicy::FIFO, 2, ExpirationConfiguration::never());
        for (key, value) in [("a", 1), ("b", 2), ("c", 3)] {
            engine.put(key, value).expect("open").into_value();
            assert!(engine.len() <= 2);
        }

        assert!(!engine.contains_key(&"a").expect("open"));
        assert_eq!(
            log.lock()[2..],
            [(EventType::Evicted, "a"), (EventType::Created, "c")]
        );
        assert_eq!(engine.stats().evictions, 1);
    }

    /// Validates lazy expiry on read.
    ///
    /// Assertions:
    /// - Confirms an expired read returns `None` and emits EXPIRED once.
    /// - Confirms a second read is a plain miss.
    #[test]
    fn test_get_expires_lazily_once() {
        let (engine, clock, log) =
            engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::lifespan(Duration::from_secs(1)));
        engine.put("a", 1).expect("open").into_value();

        clock.advance(Duration::from_secs(2));
        assert_eq!(engine.get(&"a").expect("open").into_value(), None);
        assert_eq!(engine.get(&"a").expect("open").into_value(), None);

        let expired = log.lock().iter().filter(|(kind, _)| *kind == EventType::Expired).count();
        assert_eq!(expired, 1);
        assert_eq!(engine.stats().expirations, 1);
    }

    /// Validates idle timeout is extended by reads.
    #[test]
    fn test_idle_timeout_extended_by_access() {
        let (engine, clock, _) =
            engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::idle(Duration::from_secs(3)));
        engine.put("a", 1).expect("open").into_value();

        clock.advance(Duration::from_secs(2));
        assert_eq!(engine.get(&"a").expect("open").into_value(), Some(1));
        clock.advance(Duration::from_secs(2));
        assert_eq!(engine.get(&"a").expect("open").into_value(), Some(1));
        clock.advance(Duration::from_secs(3));
        assert_eq!(engine.get(&"a").expect("open").into_value(), None);
    }

    /// Validates active purging.
    ///
    /// Assertions:
    /// - Confirms only expired entries are purged.
    /// - Confirms `contains_key` reports expired entries as absent without removing them.
    #[test]
    fn test_purge_expired() {
        let (engine, clock, log) =
            engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::lifespan(Duration::from_secs(5)));
        engine.put("old", 1).expect("open").into_value();
        clock.advance(Duration::from_secs(3));
        engine.put("new", 2).expect("open").into_value();
        clock.advance(Duration::from_secs(3));

        assert!(!engine.contains_key(&"old").expect("open"));
        assert_eq!(engine.len(), 2);

        assert_eq!(engine.purge_expired(), 1);
        assert_eq!(engine.purge_expired(), 0);
        assert_eq!(engine.len(), 1);
        assert!(engine.contains_key(&"new").expect("open"));
        assert_eq!(log.lock().last(), Some(&(EventType::Expired, "old")));
    }

    /// Validates an expired victim is reported as EXPIRED, not EVICTED.
    #[test]
    fn test_expired_victim_reported_as_expired() {
        let (engine, clock, log) =
            engine(EvictionPolicy::FIFO, 1, ExpirationConfiguration::lifespan(Duration::from_secs(1)));
        engine.put("a", 1).expect("open").into_value();
        clock.advance(Duration::from_secs(2));

        engine.put("b", 2).expect("open").into_value();

        assert_eq!(
            *log.lock(),
            vec![(EventType::Created, "a"), (EventType::Expired, "a"), (EventType::Created, "b")]
        );
        let stats = engine.stats();
        assert_eq!((stats.evictions, stats.expirations), (0, 1));
    }

    /// Validates clear emits nothing and keeps the engine usable.
    #[test]
    fn test_clear_is_silent() {
        let (engine, _, log) = engine(EvictionPolicy::LFU, 4, ExpirationConfiguration::never());
        engine.put("a", 1).expect("open").into_value();
        engine.put("b", 2).expect("open").into_value();
        let before = log.lock().len();

        engine.clear().expect("open");

        assert!(engine.is_empty());
        assert_eq!(log.lock().len(), before);
        engine.put("c", 3).expect("open").into_value();
        assert_eq!(engine.len(), 1);
    }

    /// Validates conditional operations.
    ///
    /// Assertions:
    /// - Confirms `put_if_absent` keeps the existing value.
    /// - Confirms `replace` does nothing for absent keys.
    /// - Confirms `replace_if` and `remove_if` compare the current value.
    #[test]
    fn test_conditional_operations() {
        let (engine, _, _) = engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::never());

        assert_eq!(engine.put_if_absent("a", 1).expect("open").into_value(), None);
        assert_eq!(engine.put_if_absent("a", 9).expect("open").into_value(), Some(1));

        assert_eq!(engine.replace(&"b", 2).expect("open").into_value(), None);
        assert!(!engine.contains_key(&"b").expect("open"));
        assert_eq!(engine.replace(&"a", 2).expect("open").into_value(), Some(1));

        assert!(!engine.replace_if(&"a", &1, 3).expect("open").into_value());
        assert!(engine.replace_if(&"a", &2, 3).expect("open").into_value());

        assert!(!engine.remove_if(&"a", &2).expect("open").into_value());
        assert!(engine.remove_if(&"a", &3).expect("open").into_value());
        assert!(engine.is_empty());
    }

    /// Validates `compute_if_absent` computes once.
    #[test]
    fn test_compute_if_absent() {
        let (engine, _, log) = engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::never());
        let mut calls = 0;

        let first = engine
            .compute_if_absent("a", |_| {
                calls += 1;
                7
            })
            .expect("open")
            .into_value();
        let second = engine
            .compute_if_absent("a", |_| {
                calls += 1;
                8
            })
            .expect("open")
            .into_value();

        assert_eq!((first, second, calls), (7, 7, 1));
        assert_eq!(*log.lock(), vec![(EventType::Created, "a")]);
    }

    /// Validates a closed engine rejects operations.
    ///
    /// Assertions:
    /// - Confirms reads and writes fail with `IllegalState`.
    /// - Confirms closing twice is harmless and purging does nothing.
    #[test]
    fn test_closed_engine_rejects_operations() {
        let (engine, _, _) = engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::never());
        engine.put("a", 1).expect("open").into_value();

        let _ = engine.close();
        let _ = engine.close();

        assert!(engine.is_closed());
        assert!(matches!(engine.get(&"a"), Err(CacheError::IllegalState { operation: "get", .. })));
        assert!(matches!(engine.put("b", 2), Err(CacheError::IllegalState { .. })));
        assert!(matches!(engine.clear(), Err(CacheError::IllegalState { .. })));
        assert_eq!(engine.purge_expired(), 0);
        assert!(!engine.health().is_healthy);
    }

    /// Validates listener failures are counted but never surface.
    #[test]
    fn test_listener_failure_does_not_fail_put() {
        let (engine, _, log) = engine(EvictionPolicy::LRU, 4, ExpirationConfiguration::never());
        engine.register_listener(Arc::new(crate::events::FnListener::new(
            "broken",
            |_: &CacheEntryEvent<&'static str, u32>| -> Result<(), ListenerError> {
                Err(ListenerError::failed("nope"))
            },
        )));

        assert!(engine.put("a", 1).is_ok());
        assert_eq!(log.lock().len(), 1);
        assert_eq!(engine.stats().listener_failures, 1);
    }

    /// Validates write-through and read-through against the bridge.
    ///
    /// Assertions:
    /// - Confirms puts reach the store and removals delete from it.
    /// - Confirms a miss loads from the store.
    /// - Confirms evicted entries stay in the store.
    #[test]
    fn test_write_and_read_through() {
        let store = Arc::new(InMemoryStore::new());
        let (engine, _) = persistent_engine(&store, ExpirationConfiguration::never());

        engine.put("a", 1).expect("open").into_value();
        engine.put("b", 2).expect("open").into_value();
        engine.put("c", 3).expect("open").into_value();
        assert_eq!(store.len(), 3);
        assert!(!engine.contains_key(&"a").expect("open"));

        let loaded = engine.get(&"a").expect("open");
        assert!(!loaded.is_degraded());
        assert_eq!(loaded.into_value(), Some(1));

        engine.remove(&"a").expect("open").into_value();
        assert!(!store.contains_key(&"a"));

        engine.remove(&"never-cached").expect("open").into_value();
        assert_eq!(store.delete_count(), 2);
    }

    /// Validates bridge failures degrade the outcome without rollback.
    #[test]
    fn test_persistence_failure_is_degraded_outcome() {
        let store = Arc::new(InMemoryStore::new());
        let (engine, _) = persistent_engine(&store, ExpirationConfiguration::never());

        store.set_fail_writes(true);
        let outcome = engine.put("a", 1).expect("open");
        assert!(outcome.is_degraded());
        assert_eq!(engine.get(&"a").expect("open").into_value(), Some(1));

        store.set_fail_reads(true);
        let outcome = engine.get(&"missing").expect("open");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_value(), None);

        assert_eq!(engine.stats().persistence_failures, 2);
    }

    /// Validates expiry only affects memory.
    ///
    /// Assertions:
    /// - Confirms an expired read is served again from the store.
    /// - Confirms purging and expired eviction victims never delete from the store.
    #[test]
    fn test_expiry_keeps_store_entry() {
        let store = Arc::new(InMemoryStore::new());
        let (engine, clock) =
            persistent_engine(&store, ExpirationConfiguration::lifespan(Duration::from_secs(1)));

        engine.put("a", 1).expect("open").into_value();
        clock.advance(Duration::from_secs(2));
        assert_eq!(engine.get(&"a").expect("open").into_value(), Some(1));

        engine.put("b", 2).expect("open").into_value();
        clock.advance(Duration::from_secs(2));
        assert_eq!(engine.purge_expired(), 2);
        engine.put("c", 3).expect("open").into_value();
        engine.put("d", 4).expect("open").into_value();
        clock.advance(Duration::from_secs(2));
        engine.put("e", 5).expect("open").into_value();

        assert_eq!(store.delete_count(), 0);
        assert_eq!(store.len(), 5);
        assert_eq!(engine.stats().expirations, 4);
    }

    /// Validates close flushes live entries.
    #[test]
    fn test_close_flushes() {
        let store = Arc::new(InMemoryStore::new());
        let (engine, _) = persistent_engine(&store, ExpirationConfiguration::never());
        engine.put("a", 1).expect("open").into_value();
        let stores_before = store.store_count();

        let flushed = engine.close();
        assert_eq!(flushed.into_value(), 1);
        assert_eq!(store.store_count(), stores_before + 1);
        assert!(engine.is_empty());
    }

    /// Validates a bridge for other types is rejected at creation.
    #[test]
    fn test_bridge_type_mismatch() {
        let config = CacheConfiguration::builder()
            .cache_name("typed")
            .max_entries(1)
            .eviction_policy(EvictionPolicy::LRU)
            .expiration(ExpirationConfiguration::never())
            .persistent_store(PersistentStoreConfiguration::new(Arc::new(
                InMemoryStore::<String, String>::new(),
            )))
            .build()
            .expect("valid configuration");

        let result = CacheEngine::<&'static str, u32>::new(config);
        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
    }
}

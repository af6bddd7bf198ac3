//! Persistent tier contract
//!
//! A cache with a bridge writes through on every mutation (memory first,
//! then the bridge) and reads through on a miss. Bridge failures never undo
//! the in-memory change; they come back as a degraded
//! [`Outcome`](crate::Outcome).

mod memory;

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

pub use memory::InMemoryStore;

use crate::error::PersistenceError;

/// Port to a durable store behind a cache
///
/// Calls are made while the cache lock is held, so implementations should
/// not call back into the cache.
pub trait PersistentStoreBridge<K, V>: Send + Sync {
    /// Fetch the stored value for a key
    fn load(&self, key: &K) -> Result<Option<V>, PersistenceError>;

    /// Insert or replace the stored value for a key
    fn store(&self, key: &K, value: &V) -> Result<(), PersistenceError>;

    /// Remove a key; deleting an absent key is not an error
    fn delete(&self, key: &K) -> Result<(), PersistenceError>;
}

/// Persistent tier attached to a cache configuration
///
/// The bridge's key/value types fix the types the cache can be bound to.
#[derive(Clone)]
pub struct PersistentStoreConfiguration {
    key_type: &'static str,
    value_type: &'static str,
    bridge: Arc<dyn Any + Send + Sync>,
    flush_on_shutdown: bool,
    read_through: bool,
}

impl PersistentStoreConfiguration {
    /// Attach a typed bridge
    pub fn new<K, V, B>(bridge: Arc<B>) -> Self
    where
        K: 'static,
        V: 'static,
        B: PersistentStoreBridge<K, V> + 'static,
    {
        let bridge: Arc<dyn PersistentStoreBridge<K, V>> = bridge;
        Self {
            key_type: type_name::<K>(),
            value_type: type_name::<V>(),
            bridge: Arc::new(bridge),
            flush_on_shutdown: true,
            read_through: true,
        }
    }

    /// Whether live entries are stored again when the cache shuts down
    #[must_use]
    pub fn with_flush_on_shutdown(mut self, flush_on_shutdown: bool) -> Self {
        self.flush_on_shutdown = flush_on_shutdown;
        self
    }

    /// Whether misses consult the bridge
    #[must_use]
    pub fn with_read_through(mut self, read_through: bool) -> Self {
        self.read_through = read_through;
        self
    }

    pub fn flush_on_shutdown(&self) -> bool {
        self.flush_on_shutdown
    }

    pub fn read_through(&self) -> bool {
        self.read_through
    }

    /// `(key, value)` type names of the bridge
    pub fn types(&self) -> (&'static str, &'static str) {
        (self.key_type, self.value_type)
    }

    /// Recover the typed bridge, if it was built for `K`/`V`
    pub fn bridge<K, V>(&self) -> Option<Arc<dyn PersistentStoreBridge<K, V>>>
    where
        K: 'static,
        V: 'static,
    {
        self.bridge.downcast_ref::<Arc<dyn PersistentStoreBridge<K, V>>>().cloned()
    }
}

impl fmt::Debug for PersistentStoreConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentStoreConfiguration")
            .field("key_type", &self.key_type)
            .field("value_type", &self.value_type)
            .field("flush_on_shutdown", &self.flush_on_shutdown)
            .field("read_through", &self.read_through)
            .finish_non_exhaustive()
    }
}

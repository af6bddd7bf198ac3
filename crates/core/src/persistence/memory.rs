//! Reference bridge backed by a concurrent map

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;

use super::PersistentStoreBridge;
use crate::error::{PersistenceError, PersistenceOperation};

/// In-process [`PersistentStoreBridge`] with failure injection
///
/// Useful as a stand-in for a real store in tests, and as a second tier for
/// caches whose entries should survive eviction.
#[derive(Debug)]
pub struct InMemoryStore<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, V>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    loads: AtomicU64,
    stores: AtomicU64,
    deletes: AtomicU64,
}

impl<K, V> InMemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            loads: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }

    /// Seed a value without counting it as a store call
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Current stored value
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Make `load` fail until reset
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `store` and `delete` fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `load` calls
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Number of `store` calls
    pub fn store_count(&self) -> u64 {
        self.stores.load(Ordering::Relaxed)
    }

    /// Number of `delete` calls
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    fn check_writable(&self, operation: PersistenceOperation) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::transient(operation, "injected write failure"));
        }
        Ok(())
    }
}

impl<K, V> Default for InMemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PersistentStoreBridge<K, V> for InMemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn load(&self, key: &K) -> Result<Option<V>, PersistenceError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::transient(PersistenceOperation::Load, "injected read failure"));
        }
        Ok(self.get(key))
    }

    fn store(&self, key: &K, value: &V) -> Result<(), PersistenceError> {
        self.stores.fetch_add(1, Ordering::Relaxed);
        self.check_writable(PersistenceOperation::Store)?;
        self.entries.insert(key.clone(), value.clone());
        Ok(())
    }

    fn delete(&self, key: &K) -> Result<(), PersistenceError> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.check_writable(PersistenceOperation::Delete)?;
        self.entries.remove(key);
        Ok(())
    }
}

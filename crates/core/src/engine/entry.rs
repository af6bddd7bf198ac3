//! Stored cache entry with access and expiry metadata

use std::time::Instant;

/// A key/value pair plus the timestamps expiration works from
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    key: K,
    value: V,
    created_at: Instant,
    updated_at: Instant,
    last_accessed_at: Instant,
    access_count: u64,
    expires_at: Option<Instant>,
}

impl<K, V> CacheEntry<K, V> {
    /// New entry written at `now`
    pub fn new(key: K, value: V, now: Instant) -> Self {
        Self {
            key,
            value,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            access_count: 0,
            expires_at: None,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    pub fn last_accessed_at(&self) -> Instant {
        self.last_accessed_at
    }

    /// Number of reads since the entry was created
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Deadline after which the entry is expired, if any
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub(crate) fn set_expires_at(&mut self, deadline: Option<Instant>) {
        self.expires_at = deadline;
    }

    /// Record a read at `now`
    pub(crate) fn record_access(&mut self, now: Instant) {
        self.last_accessed_at = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Replace the value at `now`, returning the previous one
    pub(crate) fn record_write(&mut self, value: V, now: Instant) -> V {
        self.updated_at = now;
        self.last_accessed_at = now;
        std::mem::replace(&mut self.value, value)
    }
}

//! Deadline computation for time-based expiration
//!
//! Expiry is lazy: the engine checks deadlines whenever it touches an entry,
//! and the manager's sweeper calls `purge_expired` periodically so untouched
//! entries do not linger forever.

use std::time::Instant;

use crate::config::ExpirationConfiguration;
use crate::engine::CacheEntry;

/// Computes and checks entry deadlines for one cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationTracker {
    config: ExpirationConfiguration,
}

impl ExpirationTracker {
    pub fn new(config: ExpirationConfiguration) -> Self {
        Self { config }
    }

    /// Whether entries can ever expire
    pub fn is_enabled(&self) -> bool {
        !self.config.is_eternal()
    }

    /// Deadline for an entry given its current timestamps
    ///
    /// The nearer of `updated_at + lifespan` and
    /// `last_accessed_at + idle_timeout`. An overflowing deadline counts as
    /// no deadline.
    pub fn deadline_for<K, V>(&self, entry: &CacheEntry<K, V>) -> Option<Instant> {
        let lifespan_deadline =
            self.config.lifespan.and_then(|lifespan| entry.updated_at().checked_add(lifespan));
        let idle_deadline = self
            .config
            .idle_timeout
            .and_then(|idle| entry.last_accessed_at().checked_add(idle));

        match (lifespan_deadline, idle_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Recompute and store the entry's deadline
    pub fn refresh<K, V>(&self, entry: &mut CacheEntry<K, V>) {
        let deadline = self.deadline_for(entry);
        entry.set_expires_at(deadline);
    }

    /// Whether the entry's stored deadline has passed at `now`
    pub fn is_expired<K, V>(&self, entry: &CacheEntry<K, V>, now: Instant) -> bool {
        entry.expires_at().is_some_and(|deadline| now >= deadline)
    }
}

//! Sequence-ordered strategies: LRU, MRU, FIFO and LIFO
//!
//! All four keep keys in a hash-linked sequence (`lru::LruCache<K, ()>`)
//! whose front is the most recent end. They differ only in whether reads
//! move a key to the front and which end supplies the victim.

use std::hash::Hash;

use lru::LruCache;

use super::EvictionStrategy;
use crate::config::EvictionPolicy;

/// Which end of the sequence supplies the victim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VictimEnd {
    Oldest,
    Newest,
}

/// Ordering strategy backed by a recency/insertion sequence
pub struct OrderedStrategy<K>
where
    K: Eq + Hash,
{
    policy: EvictionPolicy,
    order: LruCache<K, ()>,
    promote_on_access: bool,
    victim_end: VictimEnd,
}

impl<K> OrderedStrategy<K>
where
    K: Eq + Hash + Clone,
{
    /// Create a strategy for one of the sequence-ordered policies
    ///
    /// `EvictionPolicy::LFU` is not sequence-ordered; passing it yields an
    /// LRU-ordered strategy that still reports LFU, so callers should go
    /// through [`strategy_for`](super::strategy_for).
    pub fn new(policy: EvictionPolicy) -> Self {
        let (promote_on_access, victim_end) = match policy {
            EvictionPolicy::LRU | EvictionPolicy::LFU => (true, VictimEnd::Oldest),
            EvictionPolicy::MRU => (true, VictimEnd::Newest),
            EvictionPolicy::FIFO => (false, VictimEnd::Oldest),
            EvictionPolicy::LIFO => (false, VictimEnd::Newest),
        };

        Self { policy, order: LruCache::unbounded(), promote_on_access, victim_end }
    }
}

impl<K> EvictionStrategy<K> for OrderedStrategy<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    fn on_insert(&mut self, key: &K) {
        self.order.put(key.clone(), ());
    }

    fn on_access(&mut self, key: &K) {
        if self.promote_on_access {
            self.order.promote(key);
        }
    }

    fn on_remove(&mut self, key: &K) {
        self.order.pop(key);
    }

    fn select_victim(&self) -> Option<K> {
        match self.victim_end {
            VictimEnd::Oldest => self.order.peek_lru().map(|(key, _)| key.clone()),
            // `iter` walks from the most recent end
            VictimEnd::Newest => self.order.iter().next().map(|(key, _)| key.clone()),
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn clear(&mut self) {
        self.order.clear();
    }
}

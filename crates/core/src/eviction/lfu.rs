//! Least-frequently-used strategy
//!
//! Keys are ranked by `(access count, insertion sequence)`, so the victim is
//! the least accessed key and, among equals, the one inserted first.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::EvictionStrategy;
use crate::config::EvictionPolicy;

/// Position of a key in the frequency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Rank {
    count: u64,
    seq: u64,
}

/// LFU ordering with insertion-order tie breaking
#[derive(Debug)]
pub struct LfuStrategy<K> {
    ranks: HashMap<K, Rank>,
    order: BTreeMap<Rank, K>,
    next_seq: u64,
}

impl<K> LfuStrategy<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty LFU strategy
    pub fn new() -> Self {
        Self { ranks: HashMap::new(), order: BTreeMap::new(), next_seq: 0 }
    }

    /// Access count recorded for a key
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.ranks.get(key).map(|rank| rank.count)
    }
}

impl<K> Default for LfuStrategy<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionStrategy<K> for LfuStrategy<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy::LFU
    }

    fn on_insert(&mut self, key: &K) {
        let rank = Rank { count: 0, seq: self.next_seq };
        self.next_seq += 1;

        if let Some(previous) = self.ranks.insert(key.clone(), rank) {
            self.order.remove(&previous);
        }
        self.order.insert(rank, key.clone());
    }

    fn on_access(&mut self, key: &K) {
        let Some(rank) = self.ranks.get_mut(key) else {
            return;
        };

        self.order.remove(&*rank);
        rank.count = rank.count.saturating_add(1);
        self.order.insert(*rank, key.clone());
    }

    fn on_remove(&mut self, key: &K) {
        if let Some(rank) = self.ranks.remove(key) {
            self.order.remove(&rank);
        }
    }

    fn select_victim(&self) -> Option<K> {
        self.order.first_key_value().map(|(_, key)| key.clone())
    }

    fn len(&self) -> usize {
        self.ranks.len()
    }

    fn clear(&mut self) {
        self.ranks.clear();
        self.order.clear();
    }
}

//! Eviction strategies enforcing cache capacity
//!
//! Each [`EvictionPolicy`] maps to one [`EvictionStrategy`] implementation,
//! chosen once when the engine is created. Strategies only order keys; they
//! know nothing about time or persistence.
//!
//! | Policy | Victim | Access moves key |
//! |--------|--------|------------------|
//! | LRU | least recently accessed | yes |
//! | MRU | most recently accessed | yes |
//! | FIFO | oldest inserted | no |
//! | LIFO | newest inserted | no |
//! | LFU | lowest access count, oldest insertion on ties | count only |

mod lfu;
mod ordered;

use std::hash::Hash;

pub use lfu::LfuStrategy;
pub use ordered::OrderedStrategy;

use crate::config::EvictionPolicy;

/// Ordering structure used to pick eviction victims
///
/// The engine keeps the strategy in lockstep with its store: every key in the
/// store has exactly one node here and vice versa.
pub trait EvictionStrategy<K>: Send {
    /// Policy implemented by this strategy
    fn policy(&self) -> EvictionPolicy;

    /// Track a newly inserted key
    fn on_insert(&mut self, key: &K);

    /// Record a read of an existing key
    fn on_access(&mut self, key: &K);

    /// Record an overwrite of an existing key
    ///
    /// Overwrites count as accesses unless a policy says otherwise.
    fn on_update(&mut self, key: &K) {
        self.on_access(key);
    }

    /// Stop tracking a key
    fn on_remove(&mut self, key: &K);

    /// Key that should be evicted next, without removing it
    fn select_victim(&self) -> Option<K>;

    /// Number of tracked keys
    fn len(&self) -> usize;

    /// Whether no keys are tracked
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every tracked key
    fn clear(&mut self);
}

/// Build the strategy for a policy
pub fn strategy_for<K>(policy: EvictionPolicy) -> Box<dyn EvictionStrategy<K>>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    match policy {
        EvictionPolicy::LFU => Box::new(LfuStrategy::new()),
        EvictionPolicy::LRU | EvictionPolicy::MRU | EvictionPolicy::FIFO | EvictionPolicy::LIFO => {
            Box::new(OrderedStrategy::new(policy))
        }
    }
}

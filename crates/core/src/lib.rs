//! # memcache core
//!
//! Embeddable in-process caching: a [`CacheManager`] owns named caches, each
//! a bounded [`CacheEngine`] with a pluggable eviction policy, time-based
//! expiration, synchronous change events and an optional write-through /
//! read-through persistent tier.
//!
//! ## Layout
//! - [`config`]: cache and manager configuration, configuration sources
//! - [`engine`]: the per-cache store and its operations
//! - [`eviction`]: LRU, MRU, FIFO, LIFO and LFU victim selection
//! - [`expiration`]: lifespan and idle-timeout deadlines
//! - [`events`]: entry events, listeners, dispatch
//! - [`persistence`]: the persistent tier port and an in-memory bridge
//! - [`manager`]: registry, lifecycle and background expiry sweeping
//!
//! The crate installs no tracing subscriber; applications choose one.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod eviction;
pub mod expiration;
pub mod manager;
pub mod persistence;
pub mod stats;

pub use config::{
    CacheConfiguration, CacheConfigurationBuilder, ConfigurationSource, EvictionPolicy,
    ExpirationConfiguration, ManagerConfig, MemoryStoreConfiguration, StaticConfigurationSource,
};
pub use engine::{CacheEngine, CacheEntry, CacheKey, CacheValue, Outcome};
pub use error::{CacheError, CacheResult, ListenerError, PersistenceError, PersistenceOperation};
pub use events::{
    listener_fn, CacheEntryEvent, CacheEntryEventListener, EventType, FnListener, ListenerId,
    ListenerRegistration,
};
pub use manager::CacheManager;
pub use memcache_common::{Clock, ManagerHealth, ManagerStatus, MockClock, SystemClock};
pub use persistence::{InMemoryStore, PersistentStoreBridge, PersistentStoreConfiguration};
pub use stats::CacheStats;

//! Per-cache configuration and its validating builder
//!
//! A [`CacheConfiguration`] is immutable once built. Equality and hashing use
//! the cache name only, matching how the manager keys its registry.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use memcache_common::option_duration_millis;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::events::ListenerRegistration;
use crate::persistence::PersistentStoreConfiguration;

/// Eviction policy applied when a cache reaches capacity
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Least Frequently Used - evicts the entry read the fewest times
    LFU,
    /// Least Recently Used - evicts the least recently accessed entry
    LRU,
    /// Most Recently Used - evicts the most recently accessed entry
    MRU,
    /// First In First Out - evicts the oldest entry by insertion time
    FIFO,
    /// Last In First Out - evicts the newest entry by insertion time
    LIFO,
}

impl EvictionPolicy {
    /// Every policy, in declaration order
    pub const ALL: [Self; 5] = [Self::LFU, Self::LRU, Self::MRU, Self::FIFO, Self::LIFO];

    /// Configuration token for this policy
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LFU => "LFU",
            Self::LRU => "LRU",
            Self::MRU => "MRU",
            Self::FIFO => "FIFO",
            Self::LIFO => "LIFO",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|policy| policy.as_str().eq_ignore_ascii_case(s.trim())).ok_or_else(
            || CacheError::invalid_configuration("eviction_policy", format!("unknown policy '{s}'")),
        )
    }
}

/// Sizing of the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStoreConfiguration {
    /// Maximum number of live entries
    pub max_entries: usize,

    /// Number of slots to pre-allocate (capped at `max_entries`)
    #[serde(default)]
    pub initial_capacity: Option<usize>,
}

impl MemoryStoreConfiguration {
    /// Store holding at most `max_entries` entries
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries, initial_capacity: None }
    }

    /// Pre-allocate room for `capacity` entries
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Allocation hint actually used by the engine
    pub fn allocation_hint(&self) -> usize {
        self.initial_capacity.unwrap_or(0).min(self.max_entries)
    }
}

/// Time-based expiration settings
///
/// `lifespan` counts from the last write, `idle_timeout` from the last read
/// or write. When both are set the nearer deadline wins. Both `None` means
/// entries never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpirationConfiguration {
    /// Maximum age of a value since it was written
    #[serde(default, rename = "lifespan_ms", with = "option_duration_millis")]
    pub lifespan: Option<Duration>,

    /// Maximum time an entry may go unused
    #[serde(default, rename = "idle_timeout_ms", with = "option_duration_millis")]
    pub idle_timeout: Option<Duration>,
}

impl ExpirationConfiguration {
    /// Entries never expire
    pub fn never() -> Self {
        Self::default()
    }

    /// Entries expire `lifespan` after their last write
    pub fn lifespan(lifespan: Duration) -> Self {
        Self { lifespan: Some(lifespan), idle_timeout: None }
    }

    /// Entries expire after going unused for `idle_timeout`
    pub fn idle(idle_timeout: Duration) -> Self {
        Self { lifespan: None, idle_timeout: Some(idle_timeout) }
    }

    /// Add an idle timeout to this configuration
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    /// Whether neither deadline is configured
    pub fn is_eternal(&self) -> bool {
        self.lifespan.is_none() && self.idle_timeout.is_none()
    }
}

/// Immutable configuration of one named cache
#[derive(Clone)]
pub struct CacheConfiguration {
    cache_name: Arc<str>,
    memory_store: MemoryStoreConfiguration,
    persistent_store: Option<PersistentStoreConfiguration>,
    eviction_policy: EvictionPolicy,
    expiration: ExpirationConfiguration,
    listeners: Vec<ListenerRegistration>,
}

impl CacheConfiguration {
    /// Start building a configuration
    pub fn builder() -> CacheConfigurationBuilder {
        CacheConfigurationBuilder::default()
    }

    /// Unique cache name
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.cache_name)
    }

    /// In-memory store sizing
    pub fn memory_store(&self) -> &MemoryStoreConfiguration {
        &self.memory_store
    }

    /// Optional persistent tier
    pub fn persistent_store(&self) -> Option<&PersistentStoreConfiguration> {
        self.persistent_store.as_ref()
    }

    /// Eviction policy
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction_policy
    }

    /// Expiration settings
    pub fn expiration(&self) -> &ExpirationConfiguration {
        &self.expiration
    }

    /// Listener registrations in dispatch order
    pub fn listeners(&self) -> &[ListenerRegistration] {
        &self.listeners
    }
}

impl fmt::Debug for CacheConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfiguration")
            .field("cache_name", &self.cache_name)
            .field("eviction_policy", &self.eviction_policy)
            .field("memory_store", &self.memory_store)
            .field("persistent_store", &self.persistent_store)
            .field("expiration", &self.expiration)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl PartialEq for CacheConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.cache_name == other.cache_name
    }
}

impl Eq for CacheConfiguration {}

impl Hash for CacheConfiguration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cache_name.hash(state);
    }
}

/// Builder for [`CacheConfiguration`]
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use memcache_core::{CacheConfiguration, EvictionPolicy, ExpirationConfiguration};
///
/// let config = CacheConfiguration::builder()
///     .cache_name("sessions")
///     .max_entries(1_000)
///     .eviction_policy(EvictionPolicy::LRU)
///     .expiration(ExpirationConfiguration::lifespan(Duration::from_secs(300)))
///     .build()
///     .expect("configuration is complete");
///
/// assert_eq!(config.cache_name(), "sessions");
/// ```
#[derive(Default)]
pub struct CacheConfigurationBuilder {
    cache_name: Option<String>,
    memory_store: Option<MemoryStoreConfiguration>,
    persistent_store: Option<PersistentStoreConfiguration>,
    eviction_policy: Option<EvictionPolicy>,
    expiration: Option<ExpirationConfiguration>,
    listeners: Vec<ListenerRegistration>,
}

impl CacheConfigurationBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache name
    #[must_use]
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = Some(name.into());
        self
    }

    /// Set the memory store configuration
    #[must_use]
    pub fn memory_store(mut self, memory_store: MemoryStoreConfiguration) -> Self {
        self.memory_store = Some(memory_store);
        self
    }

    /// Shorthand for a memory store holding `max_entries`
    #[must_use]
    pub fn max_entries(self, max_entries: usize) -> Self {
        self.memory_store(MemoryStoreConfiguration::new(max_entries))
    }

    /// Attach a persistent tier
    #[must_use]
    pub fn persistent_store(mut self, persistent_store: PersistentStoreConfiguration) -> Self {
        self.persistent_store = Some(persistent_store);
        self
    }

    /// Set the eviction policy
    #[must_use]
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Set the expiration configuration
    #[must_use]
    pub fn expiration(mut self, expiration: ExpirationConfiguration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Append a listener
    #[must_use]
    pub fn listener(mut self, listener: ListenerRegistration) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Replace the listener list
    #[must_use]
    pub fn listeners(mut self, listeners: Vec<ListenerRegistration>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    /// Returns `CacheError::InvalidConfiguration` when the name is missing or
    /// blank, the memory store, expiration or eviction policy is missing, the
    /// store capacity is zero, or an expiration duration is zero.
    pub fn build(self) -> CacheResult<CacheConfiguration> {
        let cache_name = match self.cache_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(CacheError::invalid_configuration(
                    "cache_name",
                    "cache name must be a non-blank string",
                ))
            }
        };

        let memory_store = self.memory_store.ok_or_else(|| {
            CacheError::invalid_configuration("memory_store", "memory store configuration is required")
        })?;
        if memory_store.max_entries == 0 {
            return Err(CacheError::invalid_configuration(
                "memory_store.max_entries",
                "capacity must be greater than zero",
            ));
        }

        let expiration = self.expiration.ok_or_else(|| {
            CacheError::invalid_configuration("expiration", "expiration configuration is required")
        })?;
        if expiration.lifespan.is_some_and(|d| d.is_zero()) {
            return Err(CacheError::invalid_configuration(
                "expiration.lifespan",
                "lifespan must be greater than zero",
            ));
        }
        if expiration.idle_timeout.is_some_and(|d| d.is_zero()) {
            return Err(CacheError::invalid_configuration(
                "expiration.idle_timeout",
                "idle timeout must be greater than zero",
            ));
        }

        let eviction_policy = self.eviction_policy.ok_or_else(|| {
            CacheError::invalid_configuration("eviction_policy", "eviction policy is required")
        })?;

        Ok(CacheConfiguration {
            cache_name: Arc::from(cache_name),
            memory_store,
            persistent_store: self.persistent_store,
            eviction_policy,
            expiration,
            listeners: self.listeners,
        })
    }
}

//! Registry of named caches with an explicit lifecycle
//!
//! A [`CacheManager`] is created, `initialize`d, used, then `shutdown`. Only
//! name lookups are valid outside the `Running` state.
//!
//! Configurations are registered untyped. The first
//! [`get_cache`](CacheManager::get_cache) for a name binds it to the
//! requested key/value types and builds its engine; later lookups with other
//! types fail with `CacheError::TypeMismatch`.

mod sweeper;

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use memcache_common::{Clock, ComponentHealth, ManagerHealth, ManagerStatus, SystemClock};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use self::sweeper::Sweeper;
use crate::config::{CacheConfiguration, ConfigurationSource, ManagerConfig};
use crate::engine::{type_pair, CacheEngine, CacheKey, CacheValue, Outcome};
use crate::error::{CacheError, CacheResult};

/// Type-independent view of a bound engine
trait ManagedCache: Send + Sync {
    fn purge_expired(&self) -> usize;
    fn close(&self) -> Outcome<usize>;
    fn health(&self) -> ComponentHealth;
}

impl<K, V> ManagedCache for CacheEngine<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn purge_expired(&self) -> usize {
        CacheEngine::purge_expired(self)
    }

    fn close(&self) -> Outcome<usize> {
        CacheEngine::close(self)
    }

    fn health(&self) -> ComponentHealth {
        CacheEngine::health(self)
    }
}

struct BoundCache {
    engine: Arc<dyn Any + Send + Sync>,
    managed: Arc<dyn ManagedCache>,
    types: String,
}

struct CacheSlot {
    configuration: CacheConfiguration,
    binding: OnceCell<BoundCache>,
}

struct ManagerInner {
    config: ManagerConfig,
    clock: Arc<dyn Clock>,
    status: RwLock<ManagerStatus>,
    caches: DashMap<String, Arc<CacheSlot>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl ManagerInner {
    fn bound_caches(&self) -> Vec<Arc<dyn ManagedCache>> {
        self.caches
            .iter()
            .filter_map(|slot| slot.binding.get().map(|bound| Arc::clone(&bound.managed)))
            .collect()
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.cancel();
        }
    }
}

/// Owner of every named cache in a process
///
/// Cloning yields another handle to the same registry.
///
/// # Example
/// ```
/// use memcache_core::{CacheConfiguration, CacheManager, EvictionPolicy, ExpirationConfiguration};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> memcache_core::CacheResult<()> {
/// let manager = CacheManager::new();
/// manager.initialize().await?;
///
/// let config = CacheConfiguration::builder()
///     .cache_name("users")
///     .max_entries(100)
///     .eviction_policy(EvictionPolicy::LRU)
///     .expiration(ExpirationConfiguration::never())
///     .build()?;
/// assert!(manager.create_cache(config)?);
///
/// let users = manager.get_cache::<u64, String>("users")?.expect("cache was created");
/// let _ = users.put(1, "ada".to_string())?;
///
/// manager.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<ManagerInner>,
}

impl CacheManager {
    /// Manager with default settings
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Manager with explicit settings
    pub fn with_config(config: ManagerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Manager whose caches read time from `clock`
    pub fn with_clock(config: ManagerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                clock,
                status: RwLock::new(ManagerStatus::Created),
                caches: DashMap::new(),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Start the manager
    ///
    /// Spawns the expiry sweeper on the current tokio runtime when a sweep
    /// interval is configured.
    ///
    /// # Errors
    /// Returns `CacheError::IllegalState` unless the manager is freshly
    /// created, shut down, or left in `Error` by a failed shutdown.
    pub async fn initialize(&self) -> CacheResult<()> {
        self.claim_initialization("initialize")?;
        self.finish_initialization();
        Ok(())
    }

    /// Start the manager and create every cache a source supplies
    ///
    /// The source is loaded before any cache is created. Names the source
    /// repeats are logged and skipped. Returns the number of caches created.
    ///
    /// # Errors
    /// Returns `CacheError::IllegalState` unless the manager is freshly
    /// created, shut down, or in `Error`, and `CacheError::Configuration`
    /// when the source fails; the manager then stays in its previous state.
    pub async fn initialize_from(&self, source: &dyn ConfigurationSource) -> CacheResult<usize> {
        let previous = self.claim_initialization("initialize_from")?;

        let configurations = match source.load().await {
            Ok(configurations) => configurations,
            Err(e) => {
                *self.inner.status.write() = previous;
                warn!(error = %e, "Configuration source failed, manager not initialized");
                return Err(match e {
                    CacheError::Configuration(_) => e,
                    other => CacheError::Configuration(other.to_string()),
                });
            }
        };

        self.finish_initialization();

        let mut created = 0;
        for configuration in configurations {
            let name = configuration.cache_name().to_string();
            if self.create_cache(configuration)? {
                created += 1;
            } else {
                warn!(cache = %name, "Duplicate cache name in configuration source, skipping");
            }
        }

        info!(created, "Caches created from configuration source");
        Ok(created)
    }

    /// Register a cache under its configured name
    ///
    /// Returns `Ok(false)` and leaves the existing cache untouched when the
    /// name is taken. Concurrent calls for one name have exactly one winner.
    ///
    /// # Errors
    /// Returns `CacheError::IllegalState` when the manager is not running.
    pub fn create_cache(&self, configuration: CacheConfiguration) -> CacheResult<bool> {
        let status = self.inner.status.read();
        if !status.is_running() {
            return Err(CacheError::illegal_state("create_cache", format!("manager is {}", *status)));
        }

        match self.inner.caches.entry(configuration.cache_name().to_string()) {
            Entry::Occupied(_) => {
                debug!(cache = configuration.cache_name(), "Cache already exists");
                Ok(false)
            }
            Entry::Vacant(vacant) => {
                info!(
                    cache = configuration.cache_name(),
                    policy = %configuration.eviction_policy(),
                    capacity = configuration.memory_store().max_entries,
                    "Cache created"
                );
                vacant.insert(Arc::new(CacheSlot { configuration, binding: OnceCell::new() }));
                Ok(true)
            }
        }
    }

    /// Look up a cache as `CacheEngine<K, V>`
    ///
    /// Returns `Ok(None)` when no cache has this name or the manager is not
    /// running.
    ///
    /// # Errors
    /// Returns `CacheError::TypeMismatch` when the cache is already bound to
    /// other types or its persistent store was built for other types.
    pub fn get_cache<K, V>(&self, name: &str) -> CacheResult<Option<Arc<CacheEngine<K, V>>>>
    where
        K: CacheKey,
        V: CacheValue,
    {
        // Held until the engine is bound so shutdown sees every binding
        let status = self.inner.status.read();
        if !status.is_running() {
            return Ok(None);
        }

        let Some(slot) = self.inner.caches.get(name).map(|slot| Arc::clone(slot.value())) else {
            return Ok(None);
        };

        let bound = slot.binding.get_or_try_init(|| self.bind::<K, V>(&slot.configuration))?;
        match Arc::clone(&bound.engine).downcast::<CacheEngine<K, V>>() {
            Ok(engine) => Ok(Some(engine)),
            Err(_) => Err(CacheError::TypeMismatch {
                cache: name.to_string(),
                bound: bound.types.clone(),
                requested: type_pair::<K, V>(),
            }),
        }
    }

    /// Close and deregister one cache
    ///
    /// Returns `Ok(false)` when no cache has this name.
    ///
    /// # Errors
    /// Returns `CacheError::IllegalState` when the manager is not running.
    pub fn remove_cache(&self, name: &str) -> CacheResult<bool> {
        let status = self.inner.status.read();
        if !status.is_running() {
            return Err(CacheError::illegal_state("remove_cache", format!("manager is {}", *status)));
        }

        let Some((_, slot)) = self.inner.caches.remove(name) else {
            return Ok(false);
        };

        if let Some(bound) = slot.binding.get() {
            log_degraded_close(name, bound.managed.close());
        }
        info!(cache = name, "Cache removed");
        Ok(true)
    }

    /// Snapshot of registered cache names
    pub fn cache_names(&self) -> HashSet<String> {
        self.inner.caches.iter().map(|slot| slot.key().clone()).collect()
    }

    /// Current lifecycle status
    pub fn status(&self) -> ManagerStatus {
        *self.inner.status.read()
    }

    /// Health report with one component per bound cache
    pub fn health(&self) -> ManagerHealth {
        let status = self.status();
        if !status.is_running() {
            return ManagerHealth::unhealthy(format!("manager is {status}"));
        }

        let components = self.inner.bound_caches().iter().map(|cache| cache.health()).collect();
        ManagerHealth::from_components(components)
    }

    /// Stop the sweeper, close every cache, and empty the registry
    ///
    /// Caches configured to flush write their live entries to the persistent
    /// tier. Flush failures are logged; they do not fail the shutdown.
    ///
    /// # Errors
    /// Returns `CacheError::IllegalState` when the manager is not running,
    /// including on a second call, and `CacheError::Internal` if closing the
    /// caches panicked. The manager is then in `Error` with an empty registry
    /// and can be initialized again.
    pub async fn shutdown(&self) -> CacheResult<()> {
        {
            let mut status = self.inner.status.write();
            if !status.is_running() {
                return Err(CacheError::illegal_state("shutdown", format!("manager is {}", *status)));
            }
            *status = ManagerStatus::ShuttingDown;
        }
        info!("Shutting down cache manager");

        let sweeper = self.inner.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop(self.inner.config.shutdown_timeout).await;
        }

        let slots: Vec<(String, Arc<CacheSlot>)> = self
            .inner
            .caches
            .iter()
            .map(|slot| (slot.key().clone(), Arc::clone(slot.value())))
            .collect();
        self.inner.caches.clear();

        let cache_count = slots.len();
        let closing = tokio::task::spawn_blocking(move || {
            for (name, slot) in &slots {
                if let Some(bound) = slot.binding.get() {
                    log_degraded_close(name, bound.managed.close());
                }
            }
        });

        if let Err(e) = closing.await {
            *self.inner.status.write() = ManagerStatus::Error;
            return Err(CacheError::Internal(format!("closing caches failed: {e}")));
        }

        *self.inner.status.write() = ManagerStatus::Shutdown;
        info!(caches = cache_count, "Cache manager shut down");
        Ok(())
    }

    /// Move to `Initializing`, returning the status to restore on failure
    fn claim_initialization(&self, operation: &'static str) -> CacheResult<ManagerStatus> {
        let mut status = self.inner.status.write();
        if !status.can_initialize() {
            return Err(CacheError::illegal_state(operation, format!("manager is {}", *status)));
        }
        let previous = *status;
        *status = ManagerStatus::Initializing;
        Ok(previous)
    }

    fn finish_initialization(&self) {
        if let Some(period) = self.inner.config.effective_sweep_interval() {
            let sweeper = Sweeper::spawn(Arc::downgrade(&self.inner), period);
            if let Some(stale) = self.inner.sweeper.lock().replace(sweeper) {
                stale.cancel();
            }
        }

        *self.inner.status.write() = ManagerStatus::Running;
        info!(
            sweeper = self.inner.config.effective_sweep_interval().is_some(),
            "Cache manager initialized"
        );
    }

    fn bind<K, V>(&self, configuration: &CacheConfiguration) -> CacheResult<BoundCache>
    where
        K: CacheKey,
        V: CacheValue,
    {
        let engine = Arc::new(CacheEngine::<K, V>::with_clock(
            configuration.clone(),
            Arc::clone(&self.inner.clock),
        )?);
        let types = type_pair::<K, V>();
        debug!(cache = configuration.cache_name(), types = %types, "Cache bound to key/value types");

        let managed: Arc<dyn ManagedCache> = Arc::clone(&engine) as Arc<dyn ManagedCache>;
        Ok(BoundCache { engine, managed, types })
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("status", &self.status())
            .field("caches", &self.inner.caches.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

fn log_degraded_close(name: &str, outcome: Outcome<usize>) {
    let (flushed, error) = outcome.into_parts();
    match error {
        Some(e) => warn!(cache = name, flushed, error = %e, "Cache closed with flush failures"),
        None => debug!(cache = name, flushed, "Cache closed"),
    }
}

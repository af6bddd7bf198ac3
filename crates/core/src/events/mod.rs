//! Entry change events and listeners
//!
//! Every store mutation produces one [`CacheEntryEvent`], delivered
//! synchronously to each registered listener in registration order while
//! the cache lock is held. Listeners must therefore not call back into the
//! cache that notified them.

mod dispatcher;

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

pub use dispatcher::{EventDispatcher, ListenerId};

use crate::error::ListenerError;

/// Kind of change an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A key was inserted
    Created,
    /// An existing key's value was replaced
    Updated,
    /// A key was explicitly removed
    Removed,
    /// A key was dropped to make room
    Evicted,
    /// A key's deadline passed
    Expired,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Updated => write!(f, "UPDATED"),
            Self::Removed => write!(f, "REMOVED"),
            Self::Evicted => write!(f, "EVICTED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Notification of a single entry change
///
/// | Type | `old_value` | `new_value` |
/// |------|-------------|-------------|
/// | Created | `None` | inserted value |
/// | Updated | previous value | new value |
/// | Removed, Evicted, Expired | last value | `None` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryEvent<K, V> {
    pub key: K,
    pub old_value: Option<V>,
    pub new_value: Option<V>,
    pub event_type: EventType,
    pub cache_name: Arc<str>,
}

/// Receiver of entry change events
pub trait CacheEntryEventListener<K, V>: Send + Sync {
    /// Handle one event
    ///
    /// Errors and panics are logged and counted by the dispatcher; they
    /// never reach the caller of the cache operation.
    fn on_event(&self, event: &CacheEntryEvent<K, V>) -> Result<(), ListenerError>;

    /// Name used in logs
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

/// Listener built from a closure
pub struct FnListener<F> {
    name: String,
    handler: F,
}

impl<F> FnListener<F> {
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self { name: name.into(), handler }
    }
}

impl<K, V, F> CacheEntryEventListener<K, V> for FnListener<F>
where
    F: Fn(&CacheEntryEvent<K, V>) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &CacheEntryEvent<K, V>) -> Result<(), ListenerError> {
        (self.handler)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Register a closure as a listener for `CacheEntryEvent<K, V>`
///
/// # Example
/// ```
/// use memcache_core::{listener_fn, CacheEntryEvent};
///
/// let registration = listener_fn("audit", |event: &CacheEntryEvent<String, u64>| {
///     println!("{} {}", event.event_type, event.key);
///     Ok(())
/// });
/// assert_eq!(registration.name(), "audit");
/// ```
pub fn listener_fn<K, V, F>(name: impl Into<String>, handler: F) -> ListenerRegistration
where
    K: 'static,
    V: 'static,
    F: Fn(&CacheEntryEvent<K, V>) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    let listener: Arc<dyn CacheEntryEventListener<K, V>> = Arc::new(FnListener::new(name, handler));
    ListenerRegistration::from_dyn(listener)
}

/// Listener attached to a configuration before key/value types are known
///
/// The registration remembers the types it was created for. When the cache
/// is bound to concrete types, registrations for other types are skipped.
#[derive(Clone)]
pub struct ListenerRegistration {
    name: String,
    key_type: &'static str,
    value_type: &'static str,
    handle: Arc<dyn Any + Send + Sync>,
}

impl ListenerRegistration {
    /// Wrap a typed listener
    pub fn new<K, V, L>(listener: Arc<L>) -> Self
    where
        K: 'static,
        V: 'static,
        L: CacheEntryEventListener<K, V> + 'static,
    {
        let listener: Arc<dyn CacheEntryEventListener<K, V>> = listener;
        Self::from_dyn(listener)
    }

    /// Wrap an already type-erased listener
    pub fn from_dyn<K, V>(listener: Arc<dyn CacheEntryEventListener<K, V>>) -> Self
    where
        K: 'static,
        V: 'static,
    {
        Self {
            name: listener.name().to_string(),
            key_type: type_name::<K>(),
            value_type: type_name::<V>(),
            handle: Arc::new(listener),
        }
    }

    /// Listener name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(key, value)` type names the listener accepts
    pub fn types(&self) -> (&'static str, &'static str) {
        (self.key_type, self.value_type)
    }

    /// Recover the typed listener, if it was registered for `K`/`V`
    pub fn downcast<K, V>(&self) -> Option<Arc<dyn CacheEntryEventListener<K, V>>>
    where
        K: 'static,
        V: 'static,
    {
        self.handle.downcast_ref::<Arc<dyn CacheEntryEventListener<K, V>>>().cloned()
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("name", &self.name)
            .field("key_type", &self.key_type)
            .field("value_type", &self.value_type)
            .finish_non_exhaustive()
    }
}

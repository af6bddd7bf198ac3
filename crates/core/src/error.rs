//! Error types for cache configuration, lifecycle and persistence
//!
//! Runtime cache operations never fail for expected conditions (miss,
//! expired, full). What remains:
//!
//! - [`CacheError::InvalidConfiguration`]: a configuration failed validation
//!   at build time.
//! - [`CacheError::IllegalState`]: an operation ran before `initialize`,
//!   after `shutdown`, or against a closed cache.
//! - [`CacheError::TypeMismatch`]: a cache was looked up with key/value types
//!   other than the ones it is bound to.
//! - [`PersistenceError`]: the persistent tier failed. Cache operations
//!   report it inside their [`Outcome`](crate::Outcome) instead of failing.
//! - [`ListenerError`]: a listener failed; it is logged and counted, never
//!   returned to the caller.

use std::fmt;
use std::time::Duration;

use memcache_common::error::{ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Main error type for the cache manager and engines
#[derive(Debug, Error)]
pub enum CacheError {
    /// A required configuration field is missing or invalid
    #[error("Invalid configuration in field '{field}': {message}")]
    InvalidConfiguration { field: &'static str, message: String },

    /// Operation is not valid in the current lifecycle state
    #[error("Illegal state for '{operation}': {message}")]
    IllegalState { operation: &'static str, message: String },

    /// Cache exists but is bound to different key/value types
    #[error("Cache '{cache}' holds {bound}, requested {requested}")]
    TypeMismatch { cache: String, bound: String, requested: String },

    /// The configuration source could not supply configurations
    #[error("Configuration source error: {0}")]
    Configuration(String),

    /// Persistent tier failure surfaced as a hard error
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration { field, message: message.into() }
    }

    /// Create an illegal state error
    pub fn illegal_state(operation: &'static str, message: impl Into<String>) -> Self {
        Self::IllegalState { operation, message: message.into() }
    }
}

impl ErrorClassification for CacheError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence(e) => e.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TypeMismatch { .. } => ErrorSeverity::Info,
            Self::Persistence(e) => e.severity(),
            Self::InvalidConfiguration { .. } | Self::IllegalState { .. } | Self::Configuration(_) => {
                ErrorSeverity::Error
            }
            Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Persistence(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Persistent tier operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistenceOperation {
    /// Read-through on a miss
    Load,
    /// Write-through or shutdown flush
    Store,
    /// Propagated removal or expiration
    Delete,
}

impl fmt::Display for PersistenceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Store => write!(f, "store"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Failure reported by a [`PersistentStoreBridge`](crate::PersistentStoreBridge)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Persistent store {operation} failed: {message}")]
pub struct PersistenceError {
    operation: PersistenceOperation,
    message: String,
    retryable: bool,
}

impl PersistenceError {
    /// Create a non-retryable persistence error
    pub fn new(operation: PersistenceOperation, message: impl Into<String>) -> Self {
        Self { operation, message: message.into(), retryable: false }
    }

    /// Create a persistence error for a transient failure
    pub fn transient(operation: PersistenceOperation, message: impl Into<String>) -> Self {
        Self { operation, message: message.into(), retryable: true }
    }

    /// Operation that failed
    pub fn operation(&self) -> PersistenceOperation {
        self.operation
    }

    /// Failure detail
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ErrorClassification for PersistenceError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Failure raised by an event listener
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    /// Listener returned an error
    #[error("Listener failed: {0}")]
    Failed(String),

    /// Listener panicked during dispatch
    #[error("Listener panicked: {0}")]
    Panicked(String),
}

impl ListenerError {
    /// Create a listener failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl ErrorClassification for ListenerError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

//! Error classification shared by all memcache crates
//!
//! Crate-specific error enums are plain `thiserror` types. What they share is
//! the way callers reason about them: every error type implements
//! [`ErrorClassification`] so logging and retry decisions are uniform.
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Duplicate cache name, type mismatch on lookup |
//! | **Warning** | Degraded but operational | Persistent tier write failed, listener failed |
//! | **Error** | Failure requiring attention | Invalid configuration, illegal lifecycle call |
//! | **Critical** | Integrity at risk | Internal invariant violations |
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use memcache_common::error::{ErrorClassification, ErrorSeverity};
//!
//! #[derive(Debug, thiserror::Error)]
//! enum StoreError {
//!     #[error("store unavailable")]
//!     Unavailable,
//! }
//!
//! impl ErrorClassification for StoreError {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//!
//!     fn severity(&self) -> ErrorSeverity {
//!         ErrorSeverity::Warning
//!     }
//!
//!     fn is_critical(&self) -> bool {
//!         false
//!     }
//!
//!     fn retry_after(&self) -> Option<Duration> {
//!         Some(Duration::from_millis(100))
//!     }
//! }
//!
//! assert!(StoreError::Unavailable.is_retryable());
//! ```

use std::fmt;
use std::time::Duration;

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again, such as a persistent store that is temporarily unreachable.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorSeverity {
    /// Whether errors at this level should be surfaced to operators
    pub fn is_actionable(self) -> bool {
        self >= Self::Error
    }
}

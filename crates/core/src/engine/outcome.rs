//! Result of a cache operation that may have degraded in the persistent tier

use crate::error::PersistenceError;

/// Value of a completed cache operation plus any persistent tier failure
///
/// The in-memory part of the operation always completed. When the bridge
/// failed, the first failure is kept here instead of failing the call.
#[must_use = "an outcome may carry a persistence failure that should be checked"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    value: T,
    persistence_error: Option<PersistenceError>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(value: T, persistence_error: Option<PersistenceError>) -> Self {
        Self { value, persistence_error }
    }

    /// Outcome with no persistence failure
    pub fn complete(value: T) -> Self {
        Self::new(value, None)
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Drop any persistence failure and keep the value
    pub fn into_value(self) -> T {
        self.value
    }

    /// Whether the persistent tier failed
    pub fn is_degraded(&self) -> bool {
        self.persistence_error.is_some()
    }

    pub fn persistence_error(&self) -> Option<&PersistenceError> {
        self.persistence_error.as_ref()
    }

    /// Treat a persistence failure as an error
    pub fn into_result(self) -> Result<T, PersistenceError> {
        match self.persistence_error {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }

    pub fn into_parts(self) -> (T, Option<PersistenceError>) {
        (self.value, self.persistence_error)
    }

    /// Transform the value, keeping the persistence status
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome { value: f(self.value), persistence_error: self.persistence_error }
    }
}

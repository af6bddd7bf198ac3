//! Port for supplying cache configurations at manager startup

use async_trait::async_trait;

use super::cache::CacheConfiguration;
use crate::error::CacheResult;

/// Trait for loading the set of caches a manager should create
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Load every cache configuration
    ///
    /// Failures should be reported as `CacheError::Configuration`.
    async fn load(&self) -> CacheResult<Vec<CacheConfiguration>>;
}

/// Source backed by a fixed list of configurations
#[derive(Debug, Clone, Default)]
pub struct StaticConfigurationSource {
    configurations: Vec<CacheConfiguration>,
}

impl StaticConfigurationSource {
    /// Wrap a list of configurations
    pub fn new(configurations: Vec<CacheConfiguration>) -> Self {
        Self { configurations }
    }
}

#[async_trait]
impl ConfigurationSource for StaticConfigurationSource {
    async fn load(&self) -> CacheResult<Vec<CacheConfiguration>> {
        Ok(self.configurations.clone())
    }
}

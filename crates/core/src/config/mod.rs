//! Cache and manager configuration

mod cache;
mod manager;
mod source;

pub use cache::{
    CacheConfiguration, CacheConfigurationBuilder, EvictionPolicy, ExpirationConfiguration,
    MemoryStoreConfiguration,
};
pub use manager::ManagerConfig;
pub use source::{ConfigurationSource, StaticConfigurationSource};

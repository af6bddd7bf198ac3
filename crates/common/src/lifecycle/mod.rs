//! Lifecycle management utilities
//!
//! - **[`status`]**: Manager status transitions and health reporting

pub mod status;

pub use status::{ComponentHealth, ManagerHealth, ManagerStatus};

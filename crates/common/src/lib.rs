//! Foundation utilities shared across memcache crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification, clock abstraction, serde helpers
//! - `runtime`: lifecycle status and health reporting for long-lived managers

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod clock;
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod lifecycle;

#[cfg(feature = "foundation")]
pub use clock::{Clock, MockClock, SystemClock};
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use lifecycle::{ComponentHealth, ManagerHealth, ManagerStatus};
#[cfg(feature = "foundation")]
pub use utils::{duration_millis, option_duration_millis};

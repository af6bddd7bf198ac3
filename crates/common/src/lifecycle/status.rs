//! Manager lifecycle status and health reporting
//!
//! Long-lived managers move through [`ManagerStatus`] states and report
//! [`ManagerHealth`] snapshots built from per-component checks.

use std::fmt;
use std::time::SystemTime;

/// Manager lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerStatus {
    /// Manager has been created but not initialized
    Created,
    /// Manager is initializing
    Initializing,
    /// Manager is running and operational
    Running,
    /// Manager is shutting down
    ShuttingDown,
    /// Manager has been shut down
    Shutdown,
    /// Manager encountered an error
    Error,
}

impl ManagerStatus {
    /// Whether `initialize` is a legal transition from this status
    ///
    /// `Error` is only reached after a failed shutdown has already emptied
    /// the manager, so it may be started again.
    pub fn can_initialize(self) -> bool {
        matches!(self, Self::Created | Self::Shutdown | Self::Error)
    }

    /// Whether the manager accepts operations in this status
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for ManagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "Shutting Down"),
            Self::Shutdown => write!(f, "Shutdown"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// Manager health status
#[derive(Debug, Clone)]
pub struct ManagerHealth {
    /// Overall health status
    pub is_healthy: bool,
    /// Health score from 0.0 (unhealthy) to 1.0 (perfectly healthy)
    pub score: f64,
    /// Optional health message
    pub message: Option<String>,
    /// Individual component health checks
    pub components: Vec<ComponentHealth>,
    /// Timestamp of health check
    pub timestamp: SystemTime,
}

impl ManagerHealth {
    /// Create a healthy status
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            score: 1.0,
            message: None,
            components: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Create an unhealthy status with a message
    pub fn unhealthy<S: Into<String>>(message: S) -> Self {
        Self {
            is_healthy: false,
            score: 0.0,
            message: Some(message.into()),
            components: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Create a degraded status with a score
    pub fn degraded<S: Into<String>>(score: f64, message: S) -> Self {
        Self {
            is_healthy: score > 0.5,
            score: score.clamp(0.0, 1.0),
            message: Some(message.into()),
            components: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Add a component health check
    #[must_use]
    pub fn with_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Build a health report from component checks
    ///
    /// The score is the fraction of healthy components; an empty component
    /// list is healthy.
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        if components.is_empty() {
            return Self::healthy();
        }

        let healthy = components.iter().filter(|c| c.is_healthy).count();
        #[allow(clippy::cast_precision_loss)]
        let score = healthy as f64 / components.len() as f64;

        let mut report = if healthy == components.len() {
            Self::healthy()
        } else {
            Self::degraded(
                score,
                format!("{} of {} components unhealthy", components.len() - healthy, components.len()),
            )
        };
        report.components = components;
        report
    }
}

/// Individual component health within a manager
#[derive(Debug, Clone)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Whether the component is operational
    pub is_healthy: bool,
    /// Optional detail
    pub message: Option<String>,
}

impl ComponentHealth {
    /// Healthy component
    pub fn healthy<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    /// Unhealthy component with a reason
    pub fn unhealthy<S: Into<String>, M: Into<String>>(name: S, message: M) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }
}

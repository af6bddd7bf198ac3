//! Background task that purges expired entries on a fixed period

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ManagerInner;

/// Handle to the running sweep loop
pub(super) struct Sweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the loop on the current tokio runtime
    pub(super) fn spawn(inner: Weak<ManagerInner>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sweep_loop(inner, period, cancel.clone()));
        debug!(
            period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "Expiry sweeper started"
        );
        Self { cancel, handle }
    }

    /// Signal the loop to stop without waiting
    pub(super) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the loop and wait up to `timeout` for it to finish
    pub(super) async fn stop(self, timeout: Duration) {
        self.cancel.cancel();

        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => debug!("Expiry sweeper stopped"),
            Ok(Err(e)) => warn!(error = %e, "Expiry sweeper task failed"),
            Err(_) => warn!(
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Expiry sweeper did not stop within timeout"
            ),
        }
    }
}

async fn sweep_loop(inner: Weak<ManagerInner>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Expiry sweep loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                let Some(manager) = inner.upgrade() else {
                    break;
                };
                let caches = manager.bound_caches();
                drop(manager);

                if caches.is_empty() {
                    continue;
                }

                let sweep = tokio::task::spawn_blocking(move || {
                    caches.iter().map(|cache| cache.purge_expired()).sum::<usize>()
                });
                match sweep.await {
                    Ok(0) => {}
                    Ok(purged) => debug!(purged, "Periodic expiry sweep completed"),
                    Err(e) => warn!(error = %e, "Periodic expiry sweep failed"),
                }
            }
        }
    }
}

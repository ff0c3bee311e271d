// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic pruning of abuse-guard state.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::abuse::AbuseGuard;

/// Background task that sweeps an [`AbuseGuard`] on a fixed interval.
pub struct GuardSweeper {
    guard: Arc<AbuseGuard>,
    interval: Duration,
}

impl GuardSweeper {
    pub fn new(guard: Arc<AbuseGuard>, interval: Duration) -> Self {
        Self { guard, interval }
    }

    /// Spawn the sweep loop. It exits when `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "guard sweeper running");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let (rate, behavior) = self.guard.sweep();
                    debug!(rate_removed = rate, behavior_removed = behavior, "guard sweep complete");
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping guard sweeper");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idealab_config::model::{Environment, GuardConfig};
    use idealab_core::{ActionClass, Identity, SessionToken};

    #[tokio::test(start_paused = true)]
    async fn sweeper_prunes_and_stops_on_cancel() {
        let config = GuardConfig {
            rate_window_secs: 60,
            behavior_idle_secs: 60,
            ..GuardConfig::default()
        };
        let guard = Arc::new(AbuseGuard::from_config(&config, Environment::Development).unwrap());
        let anon = Identity::Anonymous {
            session: SessionToken::parse("s").unwrap(),
            address: "10.0.0.5".parse().unwrap(),
        };
        guard.check(&anon, ActionClass::Vote).unwrap();
        assert_eq!(guard.rate_windows().len(), 1);

        let cancel = CancellationToken::new();
        let handle = GuardSweeper::new(Arc::clone(&guard), Duration::from_secs(90))
            .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert!(guard.rate_windows().is_empty());
        assert!(guard.behavior().is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }
}

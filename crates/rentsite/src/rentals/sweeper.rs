use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::clock::Clock;
use super::repository::{RentalRepository, RepositoryError};

/// Deletes every rental whose expiration instant is strictly before `now`.
pub async fn sweep_expired<R>(repository: &R, now: DateTime<Utc>) -> Result<u64, RepositoryError>
where
    R: RentalRepository + ?Sized,
{
    let removed = repository.delete_expired(now).await?;
    if removed > 0 {
        info!(removed, %now, "removed expired rentals");
    }
    Ok(removed)
}

/// Periodic expiration sweep, independent of request traffic.
pub struct ExpirationSweeper<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl<R> ExpirationSweeper<R>
where
    R: RentalRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            repository,
            clock,
            interval,
        }
    }

    pub async fn run_once(&self) -> Result<u64, RepositoryError> {
        sweep_expired(self.repository.as_ref(), self.clock.now()).await
    }

    /// Sweeps immediately, then once per interval until `shutdown` flips to `true`
    /// or its sender is dropped. Failed sweeps are logged and retried next tick.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = self.interval.as_secs(), "expiration sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.run_once().await {
                            Ok(removed) => debug!(removed, "expiration sweep finished"),
                            Err(err) => error!(error = %err, "expiration sweep failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("expiration sweeper stopped");
        })
    }
}

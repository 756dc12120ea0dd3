//! Background expiration sweeper.
//!
//! A tokio task that wakes every `sweep_interval`, reclaims expired holds and
//! goes back to sleep. It stops when its [`SweeperHandle`] is shut down or
//! dropped.

use crate::error::ServiceError;
use crate::service::ServiceCore;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Owner of a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub(crate) fn spawn(core: Arc<ServiceCore>, every: Duration) -> Result<Self, ServiceError> {
        let runtime = Handle::try_current().map_err(|e| ServiceError::NoRuntime(e.to_string()))?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = runtime.spawn(run(core, every, shutdown_rx));
        Ok(Self {
            shutdown: shutdown_tx,
            task: Some(task),
        })
    }

    /// Signal the task and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SweeperJoin`] if the task panicked or was
    /// cancelled.
    pub async fn shutdown(mut self) -> Result<(), ServiceError> {
        self.shutdown.send(true).ok();
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| ServiceError::SweeperJoin(e.to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown.send(true).ok();
    }
}

async fn run(core: Arc<ServiceCore>, every: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    tracing::debug!(interval_ms = every.as_millis(), "Expiration sweeper started");
    while !*shutdown.borrow() {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = core.sweep_expired() {
                    tracing::error!(error = %e, "Expiration sweep failed");
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Expiration sweeper stopped");
}

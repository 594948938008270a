//! Periodic refresh driver
//!
//! The [`Scheduler`] owns one background task that awaits a refresh cycle on
//! every tick of a fixed interval. Cycles run inline in that task, so two of
//! them can never overlap; a cycle that outlasts the interval pushes the
//! next tick back instead.
//!
//! [`RefreshCycle`] is the fetch-diff-publish step the client plugs in.

mod refresh;

pub use refresh::*;


use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval_at;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    /// Shutdown signal sender (None when not running)
    shutdown_tx: Mutex<Option<watch::Sender<()>>>,

    /// Loop task handle (None when never started or already joined)
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        if self.shutdown_tx.lock().is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Spawns the refresh loop. The first cycle runs one `period` from now.
    ///
    /// Calling `start()` while running is a no-op and returns `false`.
    /// Must be called from within a tokio runtime.
    pub fn start<C, Fut>(
        &self,
        period: Duration,
        mut cycle: C,
    ) -> bool
    where
        C: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown_guard = self.shutdown_tx.lock();

        // Already running
        if shutdown_guard.is_some() {
            return false;
        }

        // A loop stopped without being awaited may still be in a cycle
        let previous = self.handle.lock().take();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    error!("Previous refresh loop task failed: {:?}", e);
                }
            }

            debug!(?period, "Refresh loop started");
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        debug!("Refresh loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        cycle().await;
                    }
                }
            }

            debug!("Refresh loop stopped");
        });

        *shutdown_guard = Some(shutdown_tx);
        *self.handle.lock() = Some(handle);
        true
    }

    /// Signals the loop to exit.
    ///
    /// A cycle already in flight runs to completion; no new cycle starts.
    /// Calling `stop()` when not running is a no-op.
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            if tx.send(()).is_err() {
                warn!("Refresh loop already gone when stop was requested");
            }
        }
    }

    /// Stops the loop and waits for its task to finish.
    pub async fn shutdown(&self) {
        self.stop();
        self.join_stopped().await;
    }

    /// Waits for a loop that was stopped but may still be finishing a cycle.
    ///
    /// Returns immediately while running, so it never waits on a live loop.
    pub async fn join_stopped(&self) {
        let handle = {
            let shutdown_guard = self.shutdown_tx.lock();
            if shutdown_guard.is_some() {
                return;
            }
            self.handle.lock().take()
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Refresh loop task failed: {:?}", e);
            }
        }
    }
}

//! Outbound notification conduits
//!
//! Refresh errors and update batches leave the scheduler through two bounded
//! [`broadcast`] channels. Publishing never waits on consumers:
//!
//! - a subscriber that falls behind loses the oldest events and is told how
//!   many through `RecvError::Lagged`
//! - an event published while nobody subscribes is dropped and counted
//!
//! A stalled consumer therefore cannot hold back cache refreshes.


use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use crate::Error;
use crate::ToggleDiff;

/// A non-empty batch of changes together with the version that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    /// Store version of the snapshot now in the cache
    pub version: u64,
    /// Changes ordered by toggle name
    pub changes: Vec<ToggleDiff>,
}

#[derive(Debug)]
pub struct Notifier {
    error_tx: broadcast::Sender<Arc<Error>>,
    update_tx: broadcast::Sender<UpdateEvent>,
    unobserved: AtomicU64,
}

impl Notifier {
    /// Both capacities must be greater than zero.
    pub fn new(
        error_capacity: usize,
        update_capacity: usize,
    ) -> Self {
        let (error_tx, _) = broadcast::channel(error_capacity);
        let (update_tx, _) = broadcast::channel(update_capacity);
        Self {
            error_tx,
            update_tx,
            unobserved: AtomicU64::new(0),
        }
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<Arc<Error>> {
        self.error_tx.subscribe()
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<UpdateEvent> {
        self.update_tx.subscribe()
    }

    /// Publishes a refresh error. Returns whether any subscriber got it.
    pub fn publish_error(
        &self,
        error: Error,
    ) -> bool {
        match self.error_tx.send(Arc::new(error)) {
            Ok(receivers) => {
                trace!(receivers, "Error event published");
                true
            }
            Err(_) => {
                self.unobserved.fetch_add(1, Ordering::Relaxed);
                trace!("Error event dropped, no subscriber");
                false
            }
        }
    }

    /// Publishes an update batch. Empty batches are never sent.
    pub fn publish_update(
        &self,
        event: UpdateEvent,
    ) -> bool {
        if event.changes.is_empty() {
            return false;
        }
        match self.update_tx.send(event) {
            Ok(receivers) => {
                trace!(receivers, "Update event published");
                true
            }
            Err(_) => {
                self.unobserved.fetch_add(1, Ordering::Relaxed);
                trace!("Update event dropped, no subscriber");
                false
            }
        }
    }

    /// Events published while nobody was subscribed
    pub fn unobserved_count(&self) -> u64 {
        self.unobserved.load(Ordering::Relaxed)
    }
}

use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::trace;

use crate::metrics;
use crate::Fetcher;
use crate::Notifier;
use crate::ToggleCache;
use crate::UpdateEvent;

/// What one fetch-diff-publish cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New snapshot installed, toggles identical to the previous one
    Unchanged { version: u64 },
    /// New snapshot installed and a batch of `changes` entries published
    Updated { version: u64, changes: usize },
    /// Fetch failed; the cache was left untouched
    Failed,
}

/// One application's fetch-diff-publish step.
pub struct RefreshCycle<F: Fetcher> {
    app_name: String,
    fetcher: Arc<F>,
    cache: Arc<ToggleCache>,
    notifier: Arc<Notifier>,
}

impl<F: Fetcher> RefreshCycle<F> {
    pub fn new(
        app_name: impl Into<String>,
        fetcher: Arc<F>,
        cache: Arc<ToggleCache>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            fetcher,
            cache,
            notifier,
        }
    }

    /// Fetches, then either installs the snapshot and publishes its diff, or
    /// publishes the error and keeps the cached snapshot.
    pub async fn run(&self) -> CycleOutcome {
        let snapshot = match self.fetcher.fetch_snapshot(&self.app_name).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(app_name = %self.app_name, "Refresh failed: {}", e);
                metrics::record_refresh_failure(&self.app_name);
                self.notifier.publish_error(e);
                return CycleOutcome::Failed;
            }
        };

        let version = snapshot.version();
        let changes = self.cache.replace_and_diff(snapshot);
        metrics::record_refresh_success(&self.app_name, version);

        if changes.is_empty() {
            trace!(app_name = %self.app_name, version, "Refresh found no changes");
            return CycleOutcome::Unchanged { version };
        }

        let count = changes.len();
        debug!(app_name = %self.app_name, version, changes = count, "Toggles changed");
        metrics::record_update_batch(&self.app_name, &changes);
        self.notifier.publish_update(UpdateEvent { version, changes });

        CycleOutcome::Updated {
            version,
            changes: count,
        }
    }
}

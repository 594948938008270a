//! Lock-free toggle cache
//!
//! Readers load the current [`Snapshot`] through an [`ArcSwap`], which costs
//! an atomic reference bump and never waits on a writer. Writers swap in a
//! whole new snapshot; the previous one is freed once the last reader that
//! loaded it lets go.


use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::trace;

use crate::diff;
use crate::Snapshot;
use crate::ToggleDiff;

/// Holds the current snapshot of one application's toggles.
#[derive(Debug)]
pub struct ToggleCache {
    current: ArcSwap<Snapshot>,

    /// Serializes writers so a diff is always taken against the snapshot it
    /// replaces. Readers never touch it.
    write_lock: Mutex<()>,
}

impl Default for ToggleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ToggleCache {
    /// Creates a cache holding [`Snapshot::empty`].
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::empty())
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the value of `name`, or `None` if the toggle is unknown.
    pub fn read(
        &self,
        name: &str,
    ) -> Option<bool> {
        self.current.load().get(name)
    }

    /// Returns the value of `name`, or `default` if the toggle is unknown.
    pub fn read_or_default(
        &self,
        name: &str,
        default: bool,
    ) -> bool {
        self.read(name).unwrap_or(default)
    }

    /// Current snapshot. Holding it pins that snapshot, not the cache.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Atomically installs `snapshot` as the current one.
    pub fn replace(
        &self,
        snapshot: Snapshot,
    ) {
        let _guard = self.write_lock.lock();
        let previous = self.current.swap(Arc::new(snapshot));
        trace!(
            previous_version = previous.version(),
            version = self.current.load().version(),
            "Snapshot replaced"
        );
    }

    /// Diffs `snapshot` against the current one and installs it, as a single
    /// step with respect to other writers.
    ///
    /// The snapshot is installed even when the batch is empty, so a version
    /// bump without toggle changes is still recorded.
    pub fn replace_and_diff(
        &self,
        snapshot: Snapshot,
    ) -> Vec<ToggleDiff> {
        let _guard = self.write_lock.lock();
        let previous = self.current.load_full();
        let changes = diff(&previous, &snapshot);
        self.current.store(Arc::new(snapshot));
        trace!(
            previous_version = previous.version(),
            changes = changes.len(),
            "Snapshot replaced with diff"
        );
        changes
    }
}

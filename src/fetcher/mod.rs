//! Snapshot retrieval from the remote toggle store.
//!
//! The refresh engine only depends on [`Fetcher`]. [`EtcdFetcher`] is the
//! built-in implementation reading an etcd v2 `/v2/keys` directory listing.

mod etcd;

pub use etcd::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;
use crate::Snapshot;

/// Produces a fresh, complete [`Snapshot`] for one application namespace.
///
/// Implementations own transport concerns: endpoint selection, timeouts and
/// any retry finer than the client's refresh interval. A returned error
/// must leave nothing half-applied; the caller keeps its previous snapshot.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch_snapshot(
        &self,
        app_name: &str,
    ) -> Result<Snapshot>;
}

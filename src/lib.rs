//! Client-side cache for remote boolean feature toggles.
//!
//! A [`ToggleClient`] keeps a full [`Snapshot`] of one application's toggles
//! in memory, refreshes it from the store on a fixed interval and publishes
//! what changed between two snapshots. Reads are served from memory and
//! never wait on the network.

mod cache;
mod client;
mod config;
mod diff;
mod errors;
mod fetcher;
pub mod metrics;
mod notify;
mod scheduler;
mod snapshot;

pub use cache::*;
pub use client::*;
pub use config::*;
pub use diff::*;
pub use errors::*;
pub use fetcher::*;
pub use notify::*;
pub use scheduler::*;
pub use snapshot::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

//! Immutable view of one application's toggles at one store revision.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::FetchError;

/// Full copy of all toggles for one application at one point in time.
///
/// A snapshot is never edited after construction; the cache swaps whole
/// snapshots, which is what lets readers go without per-key locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    toggles: BTreeMap<String, bool>,
    version: u64,
}

impl Snapshot {
    pub fn new(
        toggles: BTreeMap<String, bool>,
        version: u64,
    ) -> Self {
        Self { toggles, version }
    }

    /// Version 0, no toggles. What the cache holds before `initialise`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from `(name, value)` pairs; later duplicates win.
    pub fn from_pairs<I, K>(
        version: u64,
        pairs: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self {
            toggles: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            version,
        }
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<bool> {
        self.toggles.get(name).copied()
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.toggles.contains_key(name)
    }

    /// Revision marker reported by the store
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn toggles(&self) -> &BTreeMap<String, bool> {
        &self.toggles
    }

    pub fn len(&self) -> usize {
        self.toggles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }

    /// Toggles in lexicographic name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, bool> {
        self.toggles.iter()
    }
}

/// Strict boolean parser for stored toggle values.
///
/// Only the exact literals `true` and `false` are accepted.
pub fn parse_toggle_value(
    name: &str,
    raw: &str,
) -> std::result::Result<bool, FetchError> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(FetchError::InvalidToggleValue {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

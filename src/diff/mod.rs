//! Change detection between two snapshots.
//!
//! [`diff`] walks both toggle maps in name order at once (a merge join over
//! two `BTreeMap`s), so the cost is linear in the combined key count and the
//! resulting batch is always sorted by toggle name.


use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::Snapshot;

/// One difference between an old and a new snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleDiff {
    /// Toggle only present in the new snapshot
    Added { name: String, value: bool },
    /// Toggle only present in the old snapshot
    Removed { name: String },
    /// Toggle present in both with different values
    Changed { name: String, old: bool, new: bool },
}

impl ToggleDiff {
    pub fn name(&self) -> &str {
        match self {
            ToggleDiff::Added { name, .. } => name,
            ToggleDiff::Removed { name } => name,
            ToggleDiff::Changed { name, .. } => name,
        }
    }
}

impl fmt::Display for ToggleDiff {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ToggleDiff::Added { name, value } => write!(f, "+{name}={value}"),
            ToggleDiff::Removed { name } => write!(f, "-{name}"),
            ToggleDiff::Changed { name, old, new } => write!(f, "~{name}:{old}->{new}"),
        }
    }
}

/// Computes the changes that turn `old` into `new`.
///
/// The batch is empty when both snapshots carry the same toggles, whatever
/// their versions.
pub fn diff(
    old: &Snapshot,
    new: &Snapshot,
) -> Vec<ToggleDiff> {
    let mut changes = Vec::new();
    let mut old_iter = old.iter().peekable();
    let mut new_iter = new.iter().peekable();

    loop {
        let ordering = match (old_iter.peek(), new_iter.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((old_name, _)), Some((new_name, _))) => old_name.cmp(new_name),
        };

        match ordering {
            Ordering::Less => {
                if let Some((name, _)) = old_iter.next() {
                    changes.push(ToggleDiff::Removed { name: name.clone() });
                }
            }
            Ordering::Greater => {
                if let Some((name, value)) = new_iter.next() {
                    changes.push(ToggleDiff::Added {
                        name: name.clone(),
                        value: *value,
                    });
                }
            }
            Ordering::Equal => {
                if let (Some((name, old_value)), Some((_, new_value))) =
                    (old_iter.next(), new_iter.next())
                {
                    if old_value != new_value {
                        changes.push(ToggleDiff::Changed {
                            name: name.clone(),
                            old: *old_value,
                            new: *new_value,
                        });
                    }
                }
            }
        }
    }

    changes
}

/// Applies a batch produced by [`diff`] to a toggle map.
///
/// `apply(a.toggles(), &diff(&a, &b)) == *b.toggles()` holds for any two
/// snapshots.
pub fn apply(
    base: &BTreeMap<String, bool>,
    changes: &[ToggleDiff],
) -> BTreeMap<String, bool> {
    let mut toggles = base.clone();
    for change in changes {
        match change {
            ToggleDiff::Added { name, value } => {
                toggles.insert(name.clone(), *value);
            }
            ToggleDiff::Removed { name } => {
                toggles.remove(name);
            }
            ToggleDiff::Changed { name, new, .. } => {
                toggles.insert(name.clone(), *new);
            }
        }
    }
    toggles
}

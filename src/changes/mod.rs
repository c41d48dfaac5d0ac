//! Configuration snapshots and the differ that turns two of them into a
//! change set.


use std::collections::BTreeMap;

/// One namespace's configuration: key to value
pub type ConfigMap = BTreeMap<String, String>;

/// Ordered list of changes produced by [`diff`]
pub type ChangeSet = Vec<Change>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Key present in the new snapshot only
    Added,
    /// Key present in both snapshots with a different value
    Updated,
    /// Key present in the old snapshot only
    Deleted,
}

/// A single key-level change
///
/// For [`ChangeKind::Deleted`] the value is the last known value before
/// removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub key: String,
    pub value: String,
}

impl Change {
    pub fn added(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(ChangeKind::Added, key, value)
    }

    pub fn updated(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(ChangeKind::Updated, key, value)
    }

    pub fn deleted(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(ChangeKind::Deleted, key, value)
    }

    fn new(
        kind: ChangeKind,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Compute the changes that turn `old` into `new`.
///
/// All additions and updates come first, in `new`'s iteration order,
/// followed by all deletions in `old`'s iteration order. Callers may rely on
/// deletions being reported last. Keys whose value did not change produce no
/// entry.
pub fn diff(
    old: &ConfigMap,
    new: &ConfigMap,
) -> ChangeSet {
    let mut changes = ChangeSet::new();

    for (key, value) in new {
        match old.get(key) {
            None => changes.push(Change::added(key, value)),
            Some(previous) if previous != value => changes.push(Change::updated(key, value)),
            Some(_) => {}
        }
    }

    changes.extend(
        old.iter()
            .filter(|(key, _)| !new.contains_key(*key))
            .map(|(key, value)| Change::deleted(key, value)),
    );

    changes
}

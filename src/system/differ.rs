use std::collections::{HashMap, HashSet};

use super::snapshot::{ProcessIdentity, ProcessRow, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowChange {
    /// Identity absent from the previous snapshot.
    Added,
    /// Identity present before, with a different name or memory figure.
    Updated,
    Unchanged,
}

impl RowChange {
    pub fn is_kept(self) -> bool {
        !matches!(self, RowChange::Added)
    }
}

/// Classification of `current` against the previously displayed snapshot.
///
/// `changes[i]` describes `current.rows()[i]`. The current snapshot is always
/// rendered in full; this only records identity continuity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    changes: Vec<RowChange>,
    removed: Vec<ProcessIdentity>,
    initial: bool,
}

impl SnapshotDiff {
    pub fn changes(&self) -> &[RowChange] {
        &self.changes
    }

    pub fn change_at(&self, index: usize) -> Option<RowChange> {
        self.changes.get(index).copied()
    }

    pub fn removed(&self) -> &[ProcessIdentity] {
        &self.removed
    }

    /// True when there was no previous snapshot to compare against.
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn added_count(&self) -> usize {
        self.count(RowChange::Added)
    }

    pub fn updated_count(&self) -> usize {
        self.count(RowChange::Updated)
    }

    pub fn kept_count(&self) -> usize {
        self.changes.iter().filter(|c| c.is_kept()).count()
    }

    fn count(&self, change: RowChange) -> usize {
        self.changes.iter().filter(|&&c| c == change).count()
    }
}

pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> SnapshotDiff {
    let Some(previous) = previous else {
        return SnapshotDiff {
            changes: vec![RowChange::Added; current.len()],
            removed: Vec::new(),
            initial: true,
        };
    };

    let before: HashMap<ProcessIdentity, &ProcessRow> =
        previous.rows().iter().map(|r| (r.identity, r)).collect();

    let changes = current
        .rows()
        .iter()
        .map(|row| match before.get(&row.identity) {
            None => RowChange::Added,
            Some(old) if old.memory_bytes != row.memory_bytes || old.name != row.name => {
                RowChange::Updated
            }
            Some(_) => RowChange::Unchanged,
        })
        .collect();

    let present: HashSet<ProcessIdentity> = current.identities().collect();
    let removed = previous
        .identities()
        .filter(|id| !present.contains(id))
        .collect();

    SnapshotDiff {
        changes,
        removed,
        initial: false,
    }
}

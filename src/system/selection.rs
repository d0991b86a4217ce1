use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::snapshot::{ProcessIdentity, Snapshot};

/// Set of selected processes, keyed by identity rather than row position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: HashSet<ProcessIdentity>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: &ProcessIdentity) -> bool {
        self.ids.contains(identity)
    }

    pub fn insert(&mut self, identity: ProcessIdentity) -> bool {
        self.ids.insert(identity)
    }

    pub fn remove(&mut self, identity: &ProcessIdentity) -> bool {
        self.ids.remove(identity)
    }

    /// Returns whether the identity is selected afterwards.
    pub fn toggle(&mut self, identity: ProcessIdentity) -> bool {
        if self.ids.remove(&identity) {
            false
        } else {
            self.ids.insert(identity);
            true
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessIdentity> {
        self.ids.iter()
    }

    pub fn is_subset(&self, other: &SelectionSet) -> bool {
        self.ids.is_subset(&other.ids)
    }
}

impl FromIterator<ProcessIdentity> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = ProcessIdentity>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Keeps the identities of `old` that still have a row in `current`.
pub fn reconcile(old: &SelectionSet, current: &Snapshot) -> SelectionSet {
    if old.is_empty() {
        return SelectionSet::new();
    }
    let present: HashSet<ProcessIdentity> = current.identities().collect();
    old.iter()
        .filter(|id| present.contains(id))
        .copied()
        .collect()
}

/// The live selection, edited by the UI and reconciled by the refresh worker.
///
/// Every access goes through one lock; reconciliation reads and replaces the
/// set under a single acquisition so a concurrent click cannot be lost.
#[derive(Clone, Debug, Default)]
pub struct SharedSelection {
    inner: Arc<Mutex<SelectionSet>>,
}

impl SharedSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SelectionSet {
        self.inner.lock().clone()
    }

    pub fn contains(&self, identity: &ProcessIdentity) -> bool {
        self.inner.lock().contains(identity)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn toggle(&self, identity: ProcessIdentity) -> bool {
        self.inner.lock().toggle(identity)
    }

    pub fn remove(&self, identity: &ProcessIdentity) -> bool {
        self.inner.lock().remove(identity)
    }

    pub fn select_only(&self, identity: ProcessIdentity) {
        let mut guard = self.inner.lock();
        guard.clear();
        guard.insert(identity);
    }

    pub fn replace(&self, selection: SelectionSet) {
        *self.inner.lock() = selection;
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn reconcile(&self, current: &Snapshot) -> SelectionSet {
        let mut guard = self.inner.lock();
        let reconciled = reconcile(&guard, current);
        *guard = reconciled.clone();
        reconciled
    }
}

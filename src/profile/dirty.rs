//! Dirty-field tracking for incremental saves.
//!
//! Saves are asynchronous and editing continues while one is in flight, so
//! the tracker hands out a snapshot when a save starts and, once the write is
//! confirmed, clears only the snapshotted fields that have not been touched
//! again since. A failed save never clears anything.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::model::ProfileField;

/// The dirty set as it was when a save began.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySnapshot {
    revisions: BTreeMap<ProfileField, u64>,
}

impl DirtySnapshot {
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Fields included in this snapshot.
    pub fn fields(&self) -> impl Iterator<Item = ProfileField> + '_ {
        self.revisions.keys().copied()
    }

    pub fn contains(&self, field: ProfileField) -> bool {
        self.revisions.contains_key(&field)
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    /// Dirty field → revision of its latest edit.
    dirty: BTreeMap<ProfileField, u64>,
    next_revision: u64,
}

/// Records which fields changed since the last successful save.
#[derive(Debug, Default)]
pub struct DirtyFieldTracker {
    state: Mutex<TrackerState>,
}

impl DirtyFieldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        // The state is a plain map; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark fields as changed. Re-marking a field bumps its revision.
    pub fn mark_dirty<I>(&self, fields: I)
    where
        I: IntoIterator<Item = ProfileField>,
    {
        let mut state = self.lock();
        for field in fields {
            state.next_revision += 1;
            let revision = state.next_revision;
            state.dirty.insert(field, revision);
        }
    }

    /// Forget every dirty field.
    pub fn clear(&self) {
        self.lock().dirty.clear();
    }

    /// Names of the currently dirty fields.
    pub fn snapshot(&self) -> BTreeSet<ProfileField> {
        self.lock().dirty.keys().copied().collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.lock().dirty.is_empty()
    }

    /// Capture the dirty set atomically at the start of a save.
    pub fn begin_save(&self) -> DirtySnapshot {
        DirtySnapshot {
            revisions: self.lock().dirty.clone(),
        }
    }

    /// Clear the fields persisted by a confirmed save.
    ///
    /// A field re-edited after `snapshot` was taken keeps its dirty mark,
    /// since the value that reached storage is already stale. Returns the
    /// fields that were cleared.
    pub fn commit(&self, snapshot: &DirtySnapshot) -> Vec<ProfileField> {
        let mut state = self.lock();
        let mut cleared = Vec::with_capacity(snapshot.len());
        for (field, saved_revision) in &snapshot.revisions {
            if state.dirty.get(field) == Some(saved_revision) {
                state.dirty.remove(field);
                cleared.push(*field);
            }
        }
        cleared
    }
}

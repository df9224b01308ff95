use super::set::ChangeSet;
use crate::content::Content;
use crate::error::Result;
use crate::tree::{Entry, EntryId, Snapshot};
use crate::Error;

/// All committed change sets, oldest first.
///
/// The current snapshot is the result of applying every set in order to the
/// snapshot the list started from, so any earlier state can be rebuilt by
/// reverting sets from the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeList {
    change_sets: Vec<ChangeSet>,
}

impl ChangeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_change_sets(change_sets: Vec<ChangeSet>) -> Self {
        Self { change_sets }
    }

    /// Appends an applied change set.
    pub fn add(&mut self, change_set: ChangeSet) {
        self.change_sets.push(change_set);
    }

    pub fn len(&self) -> usize {
        self.change_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_sets.is_empty()
    }

    pub fn change_sets(&self) -> &[ChangeSet] {
        &self.change_sets
    }

    pub fn last_mut(&mut self) -> Result<&mut ChangeSet> {
        self.change_sets.last_mut().ok_or(Error::EmptyChangeList)
    }

    /// Reverts the newest change set on `snapshot` and drops it from the list.
    pub fn revert_last_on(&mut self, snapshot: &Snapshot) -> Result<Snapshot> {
        let last = self.change_sets.last().ok_or(Error::EmptyChangeList)?;
        let previous = last.revert_on(snapshot)?;
        self.change_sets.pop();
        Ok(previous)
    }

    /// Rebuilds the snapshot right after the change set at `index` was
    /// applied, or right before it when `inclusive` is set.
    pub fn revert_up_to(&self, snapshot: &Snapshot, index: usize, inclusive: bool) -> Result<Snapshot> {
        if index >= self.change_sets.len() {
            return Err(Error::ChangeSetNotFound(index));
        }
        let stop = if inclusive { index } else { index + 1 };

        let mut result = snapshot.clone();
        for set in self.change_sets[stop..].iter().rev() {
            set.revert_in_place(&mut result)?;
        }
        Ok(result)
    }

    /// Index of the newest change set carrying `label`.
    pub fn index_of_label(&self, label: &str) -> Option<usize> {
        self.change_sets
            .iter()
            .rposition(|set| set.label() == Some(label))
    }

    pub fn snapshot_at_label(&self, snapshot: &Snapshot, label: &str) -> Result<Snapshot> {
        let index = self
            .index_of_label(label)
            .ok_or_else(|| Error::LabelNotFound(label.to_string()))?;
        self.revert_up_to(snapshot, index, false)
    }

    /// Every distinct state the entry `id` went through, newest first.
    ///
    /// Walks back from `snapshot` and stops once the entry no longer exists.
    pub fn entry_history(&self, snapshot: &Snapshot, id: EntryId) -> Result<Vec<Entry>> {
        let mut history: Vec<Entry> = Vec::new();
        let mut current = snapshot.clone();

        for set in self.change_sets.iter().rev() {
            let Some(entry) = current.find_entry_by_id(id) else {
                return Ok(history);
            };
            if set.affects(id) {
                history.push(entry.clone());
            }
            set.revert_in_place(&mut current)?;
        }

        // the entry predates the oldest change set still in the list
        if let Some(entry) = current.find_entry_by_id(id) {
            if history.last() != Some(entry) {
                history.push(entry.clone());
            }
        }
        Ok(history)
    }

    /// Drops change sets older than `timestamp` from the front of the list and
    /// returns the content handles only those sets referenced.
    pub fn purge_older_than(&mut self, timestamp: i64) -> Vec<Content> {
        let count = self
            .change_sets
            .iter()
            .take_while(|set| set.timestamp() < timestamp)
            .count();

        self.change_sets
            .drain(..count)
            .flat_map(|set| set.obsolete_contents())
            .collect()
    }
}

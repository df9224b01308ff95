use super::operation::Change;
use crate::content::Content;
use crate::error::Result;
use crate::tree::{EntryId, Snapshot};

/// Changes committed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    timestamp: i64,
    label: Option<String>,
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new(timestamp: i64, changes: Vec<Change>) -> Self {
        Self {
            timestamp,
            label: None,
            changes,
        }
    }

    pub(crate) fn from_parts(timestamp: i64, label: Option<String>, changes: Vec<Change>) -> Self {
        Self {
            timestamp,
            label,
            changes,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn affects(&self, id: EntryId) -> bool {
        self.changes.iter().any(|c| c.affects(id))
    }

    /// Applies every change in order to a copy of `snapshot`.
    ///
    /// Either all changes apply and the new snapshot is returned, or the first
    /// error is returned and neither `snapshot` nor this set is modified.
    pub fn apply_to(&mut self, snapshot: &Snapshot) -> Result<Snapshot> {
        let mut next = snapshot.clone();
        let mut changes = self.changes.clone();
        for change in changes.iter_mut() {
            change.apply_to(&mut next)?;
        }
        self.changes = changes;

        tracing::debug!(
            changes = self.changes.len(),
            timestamp = self.timestamp,
            "Applied change set"
        );
        Ok(next)
    }

    /// Reverts every change in reverse order on a copy of `snapshot`.
    pub fn revert_on(&self, snapshot: &Snapshot) -> Result<Snapshot> {
        let mut previous = snapshot.clone();
        self.revert_in_place(&mut previous)?;
        Ok(previous)
    }

    /// Like [`revert_on`](Self::revert_on) but mutates `snapshot`, which is
    /// left partially reverted on error.
    pub(crate) fn revert_in_place(&self, snapshot: &mut Snapshot) -> Result<()> {
        for change in self.changes.iter().rev() {
            change.revert_on(snapshot)?;
        }
        Ok(())
    }

    pub fn obsolete_contents(&self) -> Vec<Content> {
        self.changes
            .iter()
            .flat_map(Change::obsolete_contents)
            .collect()
    }

    pub fn new_contents(&self) -> Vec<Content> {
        self.changes.iter().filter_map(Change::new_content).collect()
    }
}

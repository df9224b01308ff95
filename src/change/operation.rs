use crate::content::Content;
use crate::error::Result;
use crate::tree::{path, Entry, EntryId, IdPath, Snapshot};
use crate::Error;

/// What a change does. Fields named `previous` and `removed` are filled in
/// when the change is applied and are what `revert_on` restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    CreateFile {
        id: EntryId,
        path: String,
        content: Content,
        timestamp: i64,
    },
    CreateDirectory {
        id: EntryId,
        path: String,
    },
    ChangeFileContent {
        path: String,
        content: Content,
        timestamp: i64,
        previous: Option<(Content, i64)>,
    },
    Rename {
        path: String,
        new_name: String,
    },
    Move {
        path: String,
        new_parent: String,
    },
    Delete {
        path: String,
        removed: Option<Entry>,
    },
}

/// A reversible tree mutation.
///
/// Paths are those of the snapshot the change is applied to, so for a change
/// inside a set they already reflect every earlier change of that set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    kind: ChangeKind,
    /// Id paths touched on apply; empty until then.
    affected: Vec<IdPath>,
}

impl Change {
    pub fn create_file(id: EntryId, path: &str, content: Content, timestamp: i64) -> Self {
        Self::new(ChangeKind::CreateFile {
            id,
            path: path::normalize(path),
            content,
            timestamp,
        })
    }

    pub fn create_directory(id: EntryId, path: &str) -> Self {
        Self::new(ChangeKind::CreateDirectory {
            id,
            path: path::normalize(path),
        })
    }

    pub fn change_file_content(path: &str, content: Content, timestamp: i64) -> Self {
        Self::new(ChangeKind::ChangeFileContent {
            path: path::normalize(path),
            content,
            timestamp,
            previous: None,
        })
    }

    pub fn rename(path: &str, new_name: &str) -> Self {
        Self::new(ChangeKind::Rename {
            path: path::normalize(path),
            new_name: new_name.to_string(),
        })
    }

    pub fn move_entry(path: &str, new_parent: &str) -> Self {
        Self::new(ChangeKind::Move {
            path: path::normalize(path),
            new_parent: path::normalize(new_parent),
        })
    }

    pub fn delete(path: &str) -> Self {
        Self::new(ChangeKind::Delete {
            path: path::normalize(path),
            removed: None,
        })
    }

    fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            affected: Vec::new(),
        }
    }

    /// Rebuilds an already applied change, as read back from storage.
    pub(crate) fn from_parts(kind: ChangeKind, affected: Vec<IdPath>) -> Self {
        Self { kind, affected }
    }

    pub fn kind(&self) -> &ChangeKind {
        &self.kind
    }

    pub fn affected(&self) -> &[IdPath] {
        &self.affected
    }

    pub fn path(&self) -> &str {
        match &self.kind {
            ChangeKind::CreateFile { path, .. }
            | ChangeKind::CreateDirectory { path, .. }
            | ChangeKind::ChangeFileContent { path, .. }
            | ChangeKind::Rename { path, .. }
            | ChangeKind::Move { path, .. }
            | ChangeKind::Delete { path, .. } => path,
        }
    }

    /// True if the change touched the entry `id` or anything below it.
    pub fn affects(&self, id: EntryId) -> bool {
        self.affected.iter().any(|p| p.contains(id))
    }

    /// Content handles only reachable through this change's undo state.
    pub fn obsolete_contents(&self) -> Vec<Content> {
        match &self.kind {
            ChangeKind::ChangeFileContent {
                previous: Some((content, _)),
                ..
            } => vec![*content],
            ChangeKind::Delete {
                removed: Some(entry),
                ..
            } => entry.contents(),
            _ => Vec::new(),
        }
    }

    /// Content handle this change introduced, if any.
    pub fn new_content(&self) -> Option<Content> {
        match &self.kind {
            ChangeKind::CreateFile { content, .. }
            | ChangeKind::ChangeFileContent { content, .. } => Some(*content),
            _ => None,
        }
    }

    /// Applies the change and records what is needed to undo it. On error the
    /// snapshot and the change are left as they were.
    pub fn apply_to(&mut self, snapshot: &mut Snapshot) -> Result<()> {
        let affected = match &mut self.kind {
            ChangeKind::CreateFile {
                id,
                path,
                content,
                timestamp,
            } => vec![snapshot.create_file(path, *id, *content, *timestamp)?],

            ChangeKind::CreateDirectory { id, path } => {
                vec![snapshot.create_directory(path, *id)?]
            }

            ChangeKind::ChangeFileContent {
                path,
                content,
                timestamp,
                previous,
            } => {
                let id_path = snapshot.id_path(path)?;
                *previous = Some(snapshot.change_file_content(path, *content, *timestamp)?);
                vec![id_path]
            }

            ChangeKind::Rename { path, new_name } => {
                let id_path = snapshot.id_path(path)?;
                snapshot.rename(path, new_name)?;
                vec![id_path]
            }

            ChangeKind::Move { path, new_parent } => {
                let from = snapshot.id_path(path)?;
                let new_path = snapshot.move_entry(path, new_parent)?;
                vec![from, snapshot.id_path(&new_path)?]
            }

            ChangeKind::Delete { path, removed } => {
                let id_path = snapshot.id_path(path)?;
                *removed = Some(snapshot.delete(path)?);
                vec![id_path]
            }
        };
        self.affected = affected;
        Ok(())
    }

    /// Undoes an applied change on a snapshot in the state it left behind.
    pub fn revert_on(&self, snapshot: &mut Snapshot) -> Result<()> {
        match &self.kind {
            ChangeKind::CreateFile { path, .. } | ChangeKind::CreateDirectory { path, .. } => {
                snapshot.delete(path)?;
            }

            ChangeKind::ChangeFileContent { path, previous, .. } => {
                let (content, timestamp) = previous.ok_or_else(not_applied)?;
                snapshot.change_file_content(path, content, timestamp)?;
            }

            ChangeKind::Rename { path, new_name } => {
                let (parent, name) = path::split(path);
                snapshot.rename(&path::join(parent, new_name), name)?;
            }

            ChangeKind::Move { path, new_parent } => {
                let (parent, name) = path::split(path);
                snapshot.move_entry(&path::join(new_parent, name), parent)?;
            }

            ChangeKind::Delete { path, removed } => {
                let entry = removed.as_ref().ok_or_else(not_applied)?;
                snapshot.insert(path::parent(path), entry.clone())?;
            }
        }
        Ok(())
    }
}

fn not_applied() -> Error {
    Error::InvalidState("change has not been applied".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(changes: &mut [Change]) -> Result<(Snapshot, Vec<Snapshot>)> {
        let mut snapshot = Snapshot::new();
        let mut states = vec![snapshot.clone()];
        for change in changes.iter_mut() {
            change.apply_to(&mut snapshot)?;
            states.push(snapshot.clone());
        }
        Ok((snapshot, states))
    }

    #[test]
    fn test_every_change_reverts_exactly() -> Result<()> {
        let mut changes = vec![
            Change::create_directory(1, "src"),
            Change::create_directory(2, "src/main"),
            Change::create_file(3, "src/main/A.txt", Content::stored(0, 5), 10),
            Change::create_file(4, "src/B.txt", Content::stored(1, 5), 10),
            Change::change_file_content("src/main/A.txt", Content::stored(2, 5), 20),
            Change::rename("src/main", "java"),
            Change::move_entry("src/B.txt", "src/java"),
            Change::create_directory(5, "docs"),
            Change::move_entry("src/java", "docs"),
            Change::delete("docs"),
            Change::delete("src"),
        ];
        let (mut snapshot, states) = applied(&mut changes)?;
        assert!(snapshot.root().children().is_empty());

        for (i, change) in changes.iter().enumerate().rev() {
            change.revert_on(&mut snapshot)?;
            assert_eq!(snapshot, states[i], "reverting change {} of {:?}", i, change.kind());
        }
        assert_eq!(snapshot, Snapshot::new());
        Ok(())
    }

    #[test]
    fn test_failed_apply_leaves_change_unapplied() -> Result<()> {
        let mut snapshot = Snapshot::new();
        Change::create_file(1, "a", Content::Unavailable, 0).apply_to(&mut snapshot)?;
        let before = snapshot.clone();

        let mut duplicate = Change::create_file(2, "a", Content::Unavailable, 0);
        assert!(matches!(
            duplicate.apply_to(&mut snapshot),
            Err(Error::EntryExists(_))
        ));
        assert!(duplicate.affected().is_empty());
        assert_eq!(snapshot, before);

        let mut missing = Change::delete("b");
        assert!(missing.apply_to(&mut snapshot).is_err());
        assert!(matches!(missing.revert_on(&mut snapshot), Err(Error::InvalidState(_))));
        Ok(())
    }

    #[test]
    fn test_affected_id_paths() -> Result<()> {
        let mut changes = vec![
            Change::create_directory(1, "src"),
            Change::create_directory(2, "lib"),
            Change::create_file(3, "src/A.txt", Content::Unavailable, 0),
            Change::move_entry("src/A.txt", "lib"),
        ];
        applied(&mut changes)?;

        let create = &changes[2];
        assert_eq!(create.affected(), &[IdPath::new(vec![0, 1, 3])]);
        assert!(create.affects(1));
        assert!(create.affects(3));
        assert!(!create.affects(2));

        let mv = &changes[3];
        assert_eq!(
            mv.affected(),
            &[IdPath::new(vec![0, 1, 3]), IdPath::new(vec![0, 2, 3])]
        );
        assert!(mv.affects(1) && mv.affects(2) && mv.affects(3));
        Ok(())
    }

    #[test]
    fn test_obsolete_contents() -> Result<()> {
        let mut changes = vec![
            Change::create_directory(1, "src"),
            Change::create_file(2, "src/A.txt", Content::stored(0, 1), 0),
            Change::create_file(3, "src/B.txt", Content::stored(1, 1), 0),
            Change::change_file_content("src/A.txt", Content::stored(2, 1), 1),
            Change::delete("src"),
        ];
        applied(&mut changes)?;

        assert!(changes[1].obsolete_contents().is_empty());
        assert_eq!(changes[3].obsolete_contents(), vec![Content::stored(0, 1)]);
        assert_eq!(
            changes[4].obsolete_contents(),
            vec![Content::stored(2, 1), Content::stored(1, 1)]
        );
        assert_eq!(changes[3].new_content(), Some(Content::stored(2, 1)));
        Ok(())
    }
}

use super::difference::Difference;
use super::entry::{Entry, EntryId, ROOT_ID};
use super::path::{self, IdPath};
use crate::content::Content;
use crate::error::Result;
use crate::Error;

/// The whole tree at one point in history.
///
/// Snapshots are values: cloning one yields an independent tree, and every
/// mutation below either fully succeeds or leaves the snapshot untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    root: Entry,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            root: Entry::new_root(),
        }
    }

    /// Wraps a decoded root, checking the invariants a decoder cannot.
    pub fn from_root(root: Entry) -> Result<Self> {
        if root.id() != ROOT_ID || !root.is_directory() {
            return Err(Error::InvalidData(format!(
                "root entry must be a directory with id {}",
                ROOT_ID
            )));
        }
        let mut ids = root.ids();
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::InvalidData("duplicate entry id in tree".to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Entry {
        &self.root
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.find_entry(path).is_some()
    }

    pub fn find_entry(&self, path: &str) -> Option<&Entry> {
        path::components(path).try_fold(&self.root, |entry, name| entry.child(name))
    }

    pub fn get_entry(&self, path: &str) -> Result<&Entry> {
        self.find_entry(path)
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))
    }

    pub fn find_entry_by_id(&self, id: EntryId) -> Option<&Entry> {
        self.root.find_by_id(id)
    }

    pub fn has_id(&self, id: EntryId) -> bool {
        self.find_entry_by_id(id).is_some()
    }

    /// Current path of the entry with `id`.
    pub fn path_of(&self, id: EntryId) -> Option<String> {
        let mut trail = Vec::new();
        if !self.root.trail_to(id, &mut trail) {
            return None;
        }
        let names: Vec<&str> = trail.iter().skip(1).map(|(_, name)| name.as_str()).collect();
        Some(names.join("/"))
    }

    pub fn id_path(&self, path: &str) -> Result<IdPath> {
        let mut ids = vec![ROOT_ID];
        let mut entry = &self.root;
        for name in path::components(path) {
            entry = entry
                .child(name)
                .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;
            ids.push(entry.id());
        }
        Ok(IdPath::new(ids))
    }

    pub fn get_difference_with<'a>(&'a self, other: &'a Snapshot) -> Difference<'a> {
        Difference::between(&self.root, &other.root)
    }

    fn entry_mut(&mut self, path: &str) -> Result<&mut Entry> {
        let mut entry = &mut self.root;
        for name in path::components(path) {
            entry = entry
                .child_mut(name)
                .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;
        }
        Ok(entry)
    }

    /// Checks that `parent` is a directory without a child called `name`.
    fn check_insert(&self, parent: &str, name: &str) -> Result<()> {
        path::validate_name(name)?;
        let dir = self.get_entry(parent)?;
        if !dir.is_directory() {
            return Err(Error::NotADirectory(parent.to_string()));
        }
        if dir.child(name).is_some() {
            return Err(Error::EntryExists(path::join(parent, name)));
        }
        Ok(())
    }

    fn check_fresh_ids(&self, entry: &Entry) -> Result<()> {
        for id in entry.ids() {
            if self.has_id(id) {
                return Err(Error::InvalidOperation(format!(
                    "entry id {} is already in use",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Inserts `entry` (with its subtree) below the directory at `parent`.
    pub fn insert(&mut self, parent: &str, entry: Entry) -> Result<IdPath> {
        self.check_insert(parent, entry.name())?;
        self.check_fresh_ids(&entry)?;

        let mut id_path = self.id_path(parent)?;
        id_path = id_path.child(entry.id());
        self.entry_mut(parent)?.add_child(entry)?;
        Ok(id_path)
    }

    pub fn create_file(
        &mut self,
        path: &str,
        id: EntryId,
        content: Content,
        timestamp: i64,
    ) -> Result<IdPath> {
        let path = path::normalize(path);
        let (parent, name) = path::split(&path);
        self.insert(parent, Entry::new_file(id, name, content, timestamp))
    }

    pub fn create_directory(&mut self, path: &str, id: EntryId) -> Result<IdPath> {
        let path = path::normalize(path);
        let (parent, name) = path::split(&path);
        self.insert(parent, Entry::new_directory(id, name))
    }

    /// Returns the replaced content and timestamp.
    pub fn change_file_content(
        &mut self,
        path: &str,
        content: Content,
        timestamp: i64,
    ) -> Result<(Content, i64)> {
        if !self.get_entry(path)?.is_file() {
            return Err(Error::NotAFile(path.to_string()));
        }
        self.entry_mut(path)?.set_content(content, timestamp)
    }

    /// Renames the entry at `path` in place and returns its new path.
    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<String> {
        let path = path::normalize(path);
        if path::is_root(&path) {
            return Err(Error::InvalidOperation("cannot rename the root".to_string()));
        }
        self.get_entry(&path)?;
        let (parent, name) = path::split(&path);
        if name == new_name {
            return Ok(path.clone());
        }
        self.check_insert(parent, new_name)?;

        let dir = self.entry_mut(parent)?;
        let mut entry = dir.remove_child(name)?;
        entry.set_name(new_name.to_string());
        dir.add_child(entry)?;
        Ok(path::join(parent, new_name))
    }

    /// Moves the entry at `path` below `new_parent`, keeping its name.
    /// Returns the new path.
    pub fn move_entry(&mut self, path: &str, new_parent: &str) -> Result<String> {
        let path = path::normalize(path);
        let new_parent = path::normalize(new_parent);
        if path::is_root(&path) {
            return Err(Error::InvalidOperation("cannot move the root".to_string()));
        }
        self.get_entry(&path)?;
        if path::is_within(&new_parent, &path) {
            return Err(Error::InvalidOperation(format!(
                "cannot move '{}' into itself",
                path
            )));
        }
        let (parent, name) = path::split(&path);
        if parent == new_parent {
            return Ok(path.clone());
        }
        self.check_insert(&new_parent, name)?;

        let entry = self.entry_mut(parent)?.remove_child(name)?;
        self.entry_mut(&new_parent)?.add_child(entry)?;
        Ok(path::join(&new_parent, name))
    }

    /// Removes the entry at `path` and returns it with its whole subtree.
    pub fn delete(&mut self, path: &str) -> Result<Entry> {
        let path = path::normalize(path);
        if path::is_root(&path) {
            return Err(Error::InvalidOperation("cannot delete the root".to_string()));
        }
        self.get_entry(&path)?;
        let (parent, name) = path::split(&path);
        self.entry_mut(parent)?.remove_child(name)
    }
}

use crate::content::Content;
use crate::error::Result;
use crate::Error;

pub type EntryId = i32;

/// Id of the root directory of every snapshot.
pub const ROOT_ID: EntryId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File { content: Content, timestamp: i64 },
    /// Children sorted by name, names unique.
    Directory { children: Vec<Entry> },
}

/// A node of a snapshot tree. Directories own their children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: EntryId,
    name: String,
    kind: EntryKind,
}

impl Entry {
    pub fn new_file(id: EntryId, name: impl Into<String>, content: Content, timestamp: i64) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EntryKind::File { content, timestamp },
        }
    }

    pub fn new_directory(id: EntryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EntryKind::Directory {
                children: Vec::new(),
            },
        }
    }

    pub fn new_root() -> Self {
        Self::new_directory(ROOT_ID, "")
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File { .. })
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory { .. })
    }

    pub fn content(&self) -> Option<Content> {
        match &self.kind {
            EntryKind::File { content, .. } => Some(*content),
            EntryKind::Directory { .. } => None,
        }
    }

    pub fn timestamp(&self) -> Option<i64> {
        match &self.kind {
            EntryKind::File { timestamp, .. } => Some(*timestamp),
            EntryKind::Directory { .. } => None,
        }
    }

    /// Children of a directory; empty for files.
    pub fn children(&self) -> &[Entry] {
        match &self.kind {
            EntryKind::Directory { children } => children,
            EntryKind::File { .. } => &[],
        }
    }

    pub fn child(&self, name: &str) -> Option<&Entry> {
        let children = self.children();
        children
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|i| &children[i])
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Entry> {
        match &mut self.kind {
            EntryKind::Directory { children } => {
                let i = children
                    .binary_search_by(|c| c.name.as_str().cmp(name))
                    .ok()?;
                Some(&mut children[i])
            }
            EntryKind::File { .. } => None,
        }
    }

    /// Inserts `child` in name order. Fails if a sibling already has its name.
    pub fn add_child(&mut self, child: Entry) -> Result<()> {
        let EntryKind::Directory { children } = &mut self.kind else {
            return Err(Error::NotADirectory(self.name.clone()));
        };
        match children.binary_search_by(|c| c.name.cmp(&child.name)) {
            Ok(_) => Err(Error::EntryExists(child.name)),
            Err(pos) => {
                children.insert(pos, child);
                Ok(())
            }
        }
    }

    pub fn remove_child(&mut self, name: &str) -> Result<Entry> {
        let EntryKind::Directory { children } = &mut self.kind else {
            return Err(Error::NotADirectory(self.name.clone()));
        };
        match children.binary_search_by(|c| c.name.as_str().cmp(name)) {
            Ok(pos) => Ok(children.remove(pos)),
            Err(_) => Err(Error::EntryNotFound(name.to_string())),
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Replaces the content of a file, returning the previous content and timestamp.
    pub(crate) fn set_content(&mut self, content: Content, timestamp: i64) -> Result<(Content, i64)> {
        match &mut self.kind {
            EntryKind::File {
                content: current,
                timestamp: current_ts,
            } => Ok((
                std::mem::replace(current, content),
                std::mem::replace(current_ts, timestamp),
            )),
            EntryKind::Directory { .. } => Err(Error::NotAFile(self.name.clone())),
        }
    }

    pub fn find_by_id(&self, id: EntryId) -> Option<&Entry> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find_by_id(id))
    }

    /// Walks down from this entry, returning the names and ids leading to `id`.
    pub(crate) fn trail_to(&self, id: EntryId, trail: &mut Vec<(EntryId, String)>) -> bool {
        trail.push((self.id, self.name.clone()));
        if self.id == id {
            return true;
        }
        for child in self.children() {
            if child.trail_to(id, trail) {
                return true;
            }
        }
        trail.pop();
        false
    }

    /// Visits this entry and every descendant, depth first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Entry)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Content handles of every file in this subtree.
    pub fn contents(&self) -> Vec<Content> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Some(content) = e.content() {
                out.push(content);
            }
        });
        out
    }

    pub fn ids(&self) -> Vec<EntryId> {
        let mut out = Vec::new();
        self.walk(&mut |e| out.push(e.id));
        out
    }
}

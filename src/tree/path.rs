//! Structural paths and id paths.
//!
//! A path is a `/`-separated list of entry names relative to the root, with
//! the empty string naming the root itself. Leading, trailing and repeated
//! separators are ignored.

use std::fmt;

use itertools::Itertools;

use super::entry::{EntryId, ROOT_ID};
use crate::error::Result;
use crate::Error;

pub const SEPARATOR: char = '/';

pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|c| !c.is_empty())
}

pub fn normalize(path: &str) -> String {
    components(path).join("/")
}

/// Splits a normalized path into parent path and last name.
pub fn split(path: &str) -> (&str, &str) {
    match path.rsplit_once(SEPARATOR) {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

pub fn parent(path: &str) -> &str {
    split(path).0
}

pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}

pub fn is_root(path: &str) -> bool {
    path.is_empty()
}

/// True if `path` equals `ancestor` or lies below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    match path.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Rejects names that cannot be a single path component.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(SEPARATOR) || name == "." || name == ".." {
        return Err(Error::InvalidOperation(format!(
            "invalid entry name '{}'",
            name
        )));
    }
    Ok(())
}

/// Ids of every entry from the root down to one entry, root included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdPath(Vec<EntryId>);

impl IdPath {
    pub fn root() -> Self {
        IdPath(vec![ROOT_ID])
    }

    pub fn new(ids: Vec<EntryId>) -> Self {
        IdPath(ids)
    }

    pub fn ids(&self) -> &[EntryId] {
        &self.0
    }

    /// Id of the entry this path leads to.
    pub fn id(&self) -> EntryId {
        self.0.last().copied().unwrap_or(ROOT_ID)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.0.contains(&id)
    }

    pub fn child(&self, id: EntryId) -> IdPath {
        let mut ids = self.0.clone();
        ids.push(id);
        IdPath(ids)
    }
}

impl fmt::Display for IdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
        assert_eq!(normalize("src//main/"), "src/main");
        assert_eq!(normalize("/a/b/c"), "a/b/c");
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(split("a/b/c"), ("a/b", "c"));
        assert_eq!(split("file"), ("", "file"));
        assert_eq!(join("", "file"), "file");
        assert_eq!(join("a/b", "c"), "a/b/c");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("src/main", "src"));
        assert!(is_within("src", "src"));
        assert!(is_within("anything", ""));
        assert!(!is_within("srcfoo", "src"));
        assert!(!is_within("src", "src/main"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("A.txt").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn test_id_path() {
        let path = IdPath::root().child(3).child(7);
        assert_eq!(path.id(), 7);
        assert!(path.contains(3));
        assert!(!path.contains(5));
        assert_eq!(path.to_string(), "0.3.7");
    }
}

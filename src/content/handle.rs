use std::fmt;

use super::{ContentId, ContentStore};
use crate::error::Result;

pub const LONG_CONTENT_PLACEHOLDER: &[u8] = b"content is too long";
pub const UNAVAILABLE_CONTENT_PLACEHOLDER: &[u8] = b"content is not available";

/// Reference from a file entry to its bytes.
///
/// Only `Stored` points into a content store. The other two variants stand in
/// for bytes that were never stored or have since been purged; they report
/// fixed placeholder bytes and a zero length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Content {
    Stored { id: ContentId, length: u64 },
    Long,
    Unavailable,
}

impl Content {
    pub fn stored(id: ContentId, length: usize) -> Self {
        Content::Stored {
            id,
            length: length as u64,
        }
    }

    pub fn id(&self) -> Option<ContentId> {
        match self {
            Content::Stored { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Content::Stored { length, .. } => *length,
            Content::Long | Content::Unavailable => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the bytes can be loaded from `store`.
    pub fn is_available<S: ContentStore + ?Sized>(&self, store: &S) -> bool {
        match self {
            Content::Stored { id, .. } => store.has_content(*id),
            _ => false,
        }
    }

    /// Loads the original bytes, or the placeholder for sentinel variants.
    pub fn bytes<S: ContentStore + ?Sized>(&self, store: &mut S) -> Result<Vec<u8>> {
        match self {
            Content::Stored { id, .. } => store.load(*id)?.into_bytes(),
            Content::Long => Ok(LONG_CONTENT_PLACEHOLDER.to_vec()),
            Content::Unavailable => Ok(UNAVAILABLE_CONTENT_PLACEHOLDER.to_vec()),
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Stored { id, length } => write!(f, "content#{} ({} bytes)", id, length),
            Content::Long => write!(f, "long content"),
            Content::Unavailable => write!(f, "unavailable content"),
        }
    }
}

use std::io;

use crate::content::ContentId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    Decode(&'static str, io::Error),
    Encode(&'static str, io::Error),
    ReadError(&'static str, io::Error),
    WriteError(&'static str, io::Error),
    LockError(io::Error),
    MutexPoisoned,
    Compression(String),

    // Corruption
    CorruptedRecord { id: ContentId, offset: u64 },
    CorruptedStore(String),
    ChecksumMismatch,
    UnknownTag(&'static str, u8),
    InvalidData(String),

    // Logical preconditions
    ContentNotFound(ContentId),
    EntryNotFound(String),
    EntryExists(String),
    NotADirectory(String),
    NotAFile(String),
    EmptyChangeList,
    LabelNotFound(String),
    ChangeSetNotFound(usize),
    InvalidOperation(String),
    InvalidState(String),
}

impl Error {
    /// True for failures that mean on-disk data can no longer be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptedRecord { .. }
                | Error::CorruptedStore(_)
                | Error::Decode(..)
                | Error::ChecksumMismatch
                | Error::UnknownTag(..)
                | Error::InvalidData(_)
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IoError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::Decode(field, err) => write!(f, "Failed to decode {}: {}", field, err),
            Error::Encode(field, err) => write!(f, "Failed to encode {}: {}", field, err),
            Error::ReadError(context, err) => write!(f, "Failed to read {}: {}", context, err),
            Error::WriteError(context, err) => write!(f, "Failed to write {}: {}", context, err),
            Error::LockError(err) => write!(f, "Lock error: {}", err),
            Error::MutexPoisoned => write!(f, "Mutex was poisoned"),
            Error::Compression(msg) => write!(f, "Compression error: {}", msg),
            Error::CorruptedRecord { id, offset } => {
                write!(f, "Corrupted content record {} at offset {}", id, offset)
            }
            Error::CorruptedStore(msg) => write!(f, "Corrupted content store: {}", msg),
            Error::ChecksumMismatch => write!(f, "Checksum mismatch"),
            Error::UnknownTag(what, tag) => write!(f, "Unknown {} tag: {:#04x}", what, tag),
            Error::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            Error::ContentNotFound(id) => write!(f, "Content not found: {}", id),
            Error::EntryNotFound(path) => write!(f, "Entry not found: '{}'", path),
            Error::EntryExists(path) => write!(f, "Entry already exists: '{}'", path),
            Error::NotADirectory(path) => write!(f, "Not a directory: '{}'", path),
            Error::NotAFile(path) => write!(f, "Not a file: '{}'", path),
            Error::EmptyChangeList => write!(f, "Change list is empty"),
            Error::LabelNotFound(label) => write!(f, "Label not found: '{}'", label),
            Error::ChangeSetNotFound(index) => write!(f, "Change set not found: {}", index),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err)
            | Error::Decode(_, err)
            | Error::Encode(_, err)
            | Error::ReadError(_, err)
            | Error::WriteError(_, err)
            | Error::LockError(err) => Some(err),
            _ => None,
        }
    }
}

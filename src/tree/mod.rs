//! In-memory file tree.
//!
//! Entries are addressed either by their path, which changes on rename and
//! move, or by their id, which never does. An [`IdPath`] lists the ids from
//! the root down to one entry and is what history uses to decide whether a
//! change touched an entry.

pub mod difference;
pub mod entry;
pub mod path;
pub mod snapshot;

pub use difference::{Difference, DifferenceKind};
pub use entry::{Entry, EntryId, EntryKind, ROOT_ID};
pub use path::IdPath;
pub use snapshot::Snapshot;

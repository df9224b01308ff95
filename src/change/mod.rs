//! Reversible changes and the history log built from them.

pub mod list;
pub mod operation;
pub mod set;

pub use list::ChangeList;
pub use operation::{Change, ChangeKind};
pub use set::ChangeSet;

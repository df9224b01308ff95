//! Local history engine.
//!
//! Keeps the history of a file tree as a log of reversible change sets over
//! in-memory tree snapshots, with file contents in a checksummed append-only
//! record file.
//!
//! ```no_run
//! use localvcs::LocalVcs;
//!
//! # fn main() -> localvcs::Result<()> {
//! let mut vcs = LocalVcs::open("/tmp/history")?;
//! vcs.create_directory("src")?;
//! vcs.create_file("src/A.txt", b"hello", 0)?;
//! vcs.apply()?;
//! vcs.put_label("init")?;
//!
//! vcs.change_file_content("src/A.txt", b"world", 1)?;
//! vcs.apply()?;
//!
//! for entry in vcs.get_entry_history("src/A.txt")? {
//!     println!("{:?}", vcs.load_content(&entry)?);
//! }
//! vcs.close()?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod change;
pub mod config;
pub mod content;
pub mod encoding;
pub mod error;
pub mod flock;
pub mod hasher;
pub mod storage;
pub mod tree;
pub mod vcs;

pub use config::VcsConfig;
pub use error::{Error, Result};
pub use hasher::Hasher;
pub use vcs::{Clock, LocalVcs, SystemClock};

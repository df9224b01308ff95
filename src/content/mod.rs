//! Content storage.
//!
//! File contents are kept out of the tree snapshots and live in an
//! append-only record file instead. Every record carries its own checksum,
//! so a torn or corrupted write can never be mistaken for valid content.
//!
//! # Composition
//!
//! ```text
//! SynchronizedContentStore      one lock around everything below
//!   CachingContentStore         LRU of decoded blobs
//!     CompressingContentStore   dictionary-preset DEFLATE
//!       FileContentStore        record file + id -> offset index
//! ```
//!
//! Each layer implements [`ContentStore`] and forwards to the one it wraps,
//! so any subset can be stacked in this order.

pub mod caching;
pub mod codec;
pub mod compressing;
pub mod file;
pub mod handle;
pub mod record;
pub mod synchronized;

pub use caching::CachingContentStore;
pub use compressing::CompressingContentStore;
pub use file::FileContentStore;
pub use handle::Content;
pub use synchronized::SynchronizedContentStore;

use crate::error::Result;

/// Store-internal identifier of a content record.
pub type ContentId = i32;

/// Payload exchanged with a [`ContentStore`], in its stored representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
    compressed: bool,
}

impl Blob {
    pub fn raw(data: Vec<u8>) -> Self {
        Self {
            data,
            compressed: false,
        }
    }

    /// Wraps bytes produced by [`codec::compress`].
    pub fn compressed(data: Vec<u8>) -> Self {
        Self {
            data,
            compressed: true,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Stored representation, compressed or not.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the original bytes, inflating them when the blob is compressed.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if self.compressed {
            codec::decompress(&self.data)
        } else {
            Ok(self.data)
        }
    }
}

impl From<Vec<u8>> for Blob {
    fn from(data: Vec<u8>) -> Self {
        Blob::raw(data)
    }
}

impl From<&[u8]> for Blob {
    fn from(data: &[u8]) -> Self {
        Blob::raw(data.to_vec())
    }
}

pub trait ContentStore: Send {
    /// Appends a blob under a fresh id and returns that id.
    fn store(&mut self, blob: Blob) -> Result<ContentId>;

    /// Appends a blob under a caller-chosen id, superseding any previous record.
    fn store_as(&mut self, id: ContentId, blob: Blob) -> Result<()>;

    /// Reads and verifies the record for `id`.
    fn load(&mut self, id: ContentId) -> Result<Blob>;

    /// Soft-deletes the record for `id`. Disk space is not reclaimed.
    fn remove(&mut self, id: ContentId) -> Result<()>;

    /// Index lookup only, no I/O.
    fn has_content(&self, id: ContentId) -> bool;

    /// Makes every appended record durable.
    fn save(&mut self) -> Result<()>;

    /// Saves and releases resources. The store must not be used afterwards.
    fn close(&mut self) -> Result<()>;
}

impl<S: ContentStore + ?Sized> ContentStore for Box<S> {
    fn store(&mut self, blob: Blob) -> Result<ContentId> {
        (**self).store(blob)
    }

    fn store_as(&mut self, id: ContentId, blob: Blob) -> Result<()> {
        (**self).store_as(id, blob)
    }

    fn load(&mut self, id: ContentId) -> Result<Blob> {
        (**self).load(id)
    }

    fn remove(&mut self, id: ContentId) -> Result<()> {
        (**self).remove(id)
    }

    fn has_content(&self, id: ContentId) -> bool {
        (**self).has_content(id)
    }

    fn save(&mut self) -> Result<()> {
        (**self).save()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

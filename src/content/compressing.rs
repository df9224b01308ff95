use super::{codec, Blob, ContentId, ContentStore};
use crate::error::Result;

/// Compresses blobs on store and inflates them on load. Blobs that do not
/// shrink are passed through unchanged, so the compressed flag on disk is only
/// set when it paid off.
pub struct CompressingContentStore<S> {
    inner: S,
}

impl<S: ContentStore> CompressingContentStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn encode(blob: Blob) -> Result<Blob> {
        if blob.is_compressed() {
            return Ok(blob);
        }
        Ok(match codec::compress(blob.data())? {
            Some(compressed) => Blob::compressed(compressed),
            None => blob,
        })
    }
}

impl<S: ContentStore> ContentStore for CompressingContentStore<S> {
    fn store(&mut self, blob: Blob) -> Result<ContentId> {
        let blob = Self::encode(blob)?;
        self.inner.store(blob)
    }

    fn store_as(&mut self, id: ContentId, blob: Blob) -> Result<()> {
        let blob = Self::encode(blob)?;
        self.inner.store_as(id, blob)
    }

    fn load(&mut self, id: ContentId) -> Result<Blob> {
        let blob = self.inner.load(id)?;
        if blob.is_compressed() {
            return Ok(Blob::raw(blob.into_bytes()?));
        }
        Ok(blob)
    }

    fn remove(&mut self, id: ContentId) -> Result<()> {
        self.inner.remove(id)
    }

    fn has_content(&self, id: ContentId) -> bool {
        self.inner.has_content(id)
    }

    fn save(&mut self) -> Result<()> {
        self.inner.save()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

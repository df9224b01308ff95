use super::{Blob, ContentId, ContentStore};
use crate::cache::Cache;
use crate::error::Result;

/// Keeps the most recently stored or loaded blobs in memory.
pub struct CachingContentStore<S> {
    inner: S,
    cache: Cache<ContentId, Blob>,
}

impl<S: ContentStore> CachingContentStore<S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            cache: Cache::new(
                capacity,
                Some(Box::new(|id: ContentId, blob: Blob| {
                    tracing::trace!(id, len = blob.len(), "Evicted cached content");
                })),
            ),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// (hits, misses) of the underlying cache.
    pub fn cache_stats(&self) -> (usize, usize) {
        self.cache.stats()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl<S: ContentStore> ContentStore for CachingContentStore<S> {
    fn store(&mut self, blob: Blob) -> Result<ContentId> {
        let id = self.inner.store(blob.clone())?;
        self.cache.insert(id, blob);
        Ok(id)
    }

    fn store_as(&mut self, id: ContentId, blob: Blob) -> Result<()> {
        // drop the stale entry first so a failed write cannot leave it behind
        self.cache.remove(&id);
        self.inner.store_as(id, blob.clone())?;
        self.cache.insert(id, blob);
        Ok(())
    }

    fn load(&mut self, id: ContentId) -> Result<Blob> {
        if let Some(blob) = self.cache.get(&id) {
            return Ok(blob.clone());
        }
        let blob = self.inner.load(id)?;
        self.cache.insert(id, blob.clone());
        Ok(blob)
    }

    fn remove(&mut self, id: ContentId) -> Result<()> {
        self.cache.remove(&id);
        self.inner.remove(id)
    }

    fn has_content(&self, id: ContentId) -> bool {
        self.inner.has_content(id)
    }

    fn save(&mut self) -> Result<()> {
        self.inner.save()
    }

    fn close(&mut self) -> Result<()> {
        self.cache.clear();
        self.inner.close()
    }
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Blob, ContentId, ContentStore};
use crate::error::Result;
use crate::Error;

/// Serializes every operation on the wrapped store behind one mutex.
/// Clones share the same store.
pub struct SynchronizedContentStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SynchronizedContentStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ContentStore> SynchronizedContentStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>> {
        self.inner.lock().map_err(|_| Error::MutexPoisoned)
    }

    /// Runs `f` with exclusive access to the wrapped store.
    pub fn with<T>(&self, f: impl FnOnce(&mut S) -> T) -> Result<T> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }
}

impl<S: ContentStore> ContentStore for SynchronizedContentStore<S> {
    fn store(&mut self, blob: Blob) -> Result<ContentId> {
        self.lock()?.store(blob)
    }

    fn store_as(&mut self, id: ContentId, blob: Blob) -> Result<()> {
        self.lock()?.store_as(id, blob)
    }

    fn load(&mut self, id: ContentId) -> Result<Blob> {
        self.lock()?.load(id)
    }

    fn remove(&mut self, id: ContentId) -> Result<()> {
        self.lock()?.remove(id)
    }

    fn has_content(&self, id: ContentId) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .has_content(id)
    }

    fn save(&mut self) -> Result<()> {
        self.lock()?.save()
    }

    fn close(&mut self) -> Result<()> {
        self.lock()?.close()
    }
}

//! Revocable handles bound to in-memory image bytes.
//!
//! An [`ObjectUrl`] is the equivalent of a browser object URL: a short string
//! (`blob:photo-upload/<id>`) that refers to bytes held by a
//! [`ResourceRegistry`]. The handle releases its registry entry when dropped,
//! so every exit path (success, error, teardown) gives the memory back without
//! an explicit revoke call.
//!
//! The registry counts acquisitions and releases. Tests use those counters to
//! prove that handles are released exactly once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
    /// Releases of an id that was no longer live. Always zero unless a
    /// handle was forged or the registry was cleared underneath it.
    stale_releases: AtomicU64,
    live: Mutex<HashMap<u64, Arc<[u8]>>>,
}

/// Owner of every live [`ObjectUrl`]. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    inner: Arc<Inner>,
}

/// Snapshot of registry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStats {
    pub acquired: u64,
    pub released: u64,
    pub stale_releases: u64,
    pub live: usize,
}

impl ResourceStats {
    /// Every handle ever created has been released exactly once.
    pub fn balanced(&self) -> bool {
        self.acquired == self.released && self.live == 0 && self.stale_releases == 0
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `bytes` to a fresh handle. Ids are never reused.
    pub fn acquire(&self, bytes: Arc<[u8]>) -> ObjectUrl {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, bytes);
        self.inner.acquired.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(id, "object url acquired");
        ObjectUrl {
            id,
            url: format!("blob:photo-upload/{id}"),
            registry: self.clone(),
        }
    }

    /// Bytes behind a live handle URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        let id: u64 = url.strip_prefix("blob:photo-upload/")?.parse().ok()?;
        self.inner
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            acquired: self.inner.acquired.load(Ordering::Relaxed),
            released: self.inner.released.load(Ordering::Relaxed),
            stale_releases: self.inner.stale_releases.load(Ordering::Relaxed),
            live: self
                .inner
                .live
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .len(),
        }
    }

    fn release(&self, id: u64) {
        let removed = self
            .inner
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        if removed.is_some() {
            self.inner.released.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(id, "object url released");
        } else {
            self.inner.stale_releases.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(id, "release of an object url that is not live");
        }
    }
}

/// A revocable handle. Released when dropped or [`revoke`](Self::revoke)d.
pub struct ObjectUrl {
    id: u64,
    url: String,
    registry: ResourceRegistry,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bytes this handle refers to.
    pub fn bytes(&self) -> Option<Arc<[u8]>> {
        self.registry.resolve(&self.url)
    }

    /// Release now. Consumes the handle, so it cannot be released twice.
    pub fn revoke(self) {
        drop(self);
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

impl std::fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ObjectUrl").field(&self.url).finish()
    }
}

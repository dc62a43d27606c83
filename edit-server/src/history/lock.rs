//! Per-image mutual exclusion
//!
//! Every state-changing call (forward operation, undo, restore, retention,
//! delete) holds the image's guard for its whole duration. Different ids
//! never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct ImageLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held while an image is being mutated; released on drop
#[derive(Debug)]
pub struct ImageGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ImageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, image_id: &str) -> ImageGuard {
        // Clone the Arc so the map shard is not held across the await.
        let mutex = Arc::clone(&self.inner.entry(image_id.to_string()).or_default());
        let guard = mutex.lock_owned().await;
        ImageGuard { _guard: guard }
    }

    /// Drop the entry for an image nobody holds or waits on
    pub fn forget(&self, image_id: &str) {
        self.inner
            .remove_if(image_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Drop all idle entries. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        before.saturating_sub(self.inner.len())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

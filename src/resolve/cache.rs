//! Single-flight resolution cache.
//!
//! Each key owns an async mutex around its slot. The first caller for a key
//! computes the value while holding that lock; concurrent callers wait on the
//! same lock and then read the stored value.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as SlotLock;

use super::types::{CacheStats, ResolvedDependency};
use crate::error::ResolveError;

pub type Slot = Arc<SlotLock<Option<ResolvedDependency>>>;

/// A dependency id plus the explicit path override it was resolved with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub id: String,
    pub custom_path: Option<String>,
}

#[derive(Default)]
pub struct ResolutionCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_resolve<F, Fut>(
        &self,
        key: CacheKey,
        resolve: F,
    ) -> Result<ResolvedDependency, ResolveError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResolvedDependency, ResolveError>>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        if let Some(cached) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let resolved = resolve().await?;
        *guard = Some(resolved.clone());
        Ok(resolved)
    }

    /// Slots whose key id is `id`, regardless of path override.
    pub fn slots_for(&self, id: &str) -> Vec<Slot> {
        self.lock()
            .iter()
            .filter(|(key, _)| key.id == id)
            .map(|(_, slot)| slot.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.lock().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, key: CacheKey) -> Slot {
        self.lock().entry(key).or_default().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

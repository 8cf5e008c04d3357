//! Eviction Policy: bound each runtime partition to `max_entries`.
//!
//! Every runtime write goes through [`EvictionPolicy::put`]. The write and
//! the eviction pass that follows it run under a per-partition lock, so
//! concurrent writers to one partition never interleave between the count
//! check and the deletes. The eviction pass itself runs on a spawned task
//! that keeps holding the lock: the writer returns as soon as its entry is
//! stored, and the next writer to the same partition waits for eviction to
//! finish. A partition therefore exceeds its bound by at most one entry,
//! and only until that pass completes.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::Error;
use crate::cache::{CacheKey, CacheStore};
use crate::routing::{CacheName, RoutePattern};
use crate::transport::Response;

struct Bound {
    partition: String,
    max_entries: NonZeroUsize,
    lock: Arc<Mutex<()>>,
}

/// Size bounds and write serialization for runtime partitions.
pub struct EvictionPolicy {
    store: Arc<dyn CacheStore>,
    bounds: HashMap<CacheName, Bound>,
}

impl EvictionPolicy {
    /// Build one bound per configured route.
    pub fn new<'a>(store: Arc<dyn CacheStore>, routes: impl IntoIterator<Item = &'a RoutePattern>) -> Self {
        let bounds = routes
            .into_iter()
            .map(|route| {
                (
                    route.cache_name.clone(),
                    Bound {
                        partition: route.partition.clone(),
                        max_entries: route.max_entries,
                        lock: Arc::new(Mutex::new(())),
                    },
                )
            })
            .collect();
        Self { store, bounds }
    }

    fn bound(&self, cache_name: &CacheName) -> Result<&Bound, Error> {
        self.bounds
            .get(cache_name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown cache name: {cache_name}")))
    }

    /// Store `response` under `key` and schedule eviction for the partition.
    ///
    /// Returns once the entry is written. Eviction completes before any other
    /// write to the same partition is admitted.
    pub async fn put(&self, cache_name: &CacheName, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let bound = self.bound(cache_name)?;
        let guard = Arc::clone(&bound.lock).lock_owned().await;

        self.store.put(&bound.partition, key, response).await?;

        let store = Arc::clone(&self.store);
        let partition = bound.partition.clone();
        let max_entries = bound.max_entries;
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = evict_oldest(store.as_ref(), &partition, max_entries).await {
                tracing::warn!(partition = %partition, error = %e, "eviction pass failed");
            }
        });

        Ok(())
    }

    /// Drop every entry of `cache_name`, serialized with writes to it.
    pub async fn clear(&self, cache_name: &CacheName) -> Result<bool, Error> {
        let bound = self.bound(cache_name)?;
        let _guard = bound.lock.lock().await;
        self.store.delete_cache(&bound.partition).await
    }

    /// Wait until no write or eviction is in flight for `cache_name`.
    pub async fn settle(&self, cache_name: &CacheName) -> Result<(), Error> {
        let bound = self.bound(cache_name)?;
        drop(bound.lock.lock().await);
        Ok(())
    }
}

/// Delete keys from the oldest end of `partition` until at most
/// `max_entries` remain. Returns how many keys were deleted.
pub async fn evict_oldest(store: &dyn CacheStore, partition: &str, max_entries: NonZeroUsize) -> Result<usize, Error> {
    let keys = store.keys_ordered_by_insertion(partition).await?;
    let excess = keys.len().saturating_sub(max_entries.get());
    if excess == 0 {
        return Ok(0);
    }

    for key in &keys[..excess] {
        store.delete(partition, key).await?;
    }

    tracing::debug!(partition, evicted = excess, kept = max_entries.get(), "evicted oldest entries");
    Ok(excess)
}

//! In-process [`CacheStore`].
//!
//! Useful for ephemeral workers and for tests. An optional quota on the
//! total number of entries makes writes fail with
//! [`Error::QuotaExceeded`], mimicking an exhausted browser storage quota.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{CacheEntry, CacheKey, CacheStore, PrecacheRecord};
use crate::Error;
use crate::transport::Response;

#[derive(Default)]
struct State {
    partitions: HashMap<String, HashMap<CacheKey, CacheEntry>>,
    precache: HashMap<String, PrecacheRecord>,
    next_seq: i64,
}

impl State {
    fn entry_count(&self) -> usize {
        self.partitions.values().map(HashMap::len).sum()
    }
}

/// Cache store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store refusing new keys once `max_entries` entries exist in total.
    ///
    /// Overwriting an existing key never counts against the quota.
    pub fn with_quota(max_entries: usize) -> Self {
        Self { state: RwLock::default(), quota: Some(max_entries) }
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let state = self.state.read().await;
        Ok(state.partitions.get(partition).and_then(|p| p.get(key)).cloned())
    }

    async fn put(&self, partition: &str, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let mut state = self.state.write().await;

        let exists = state.partitions.get(partition).is_some_and(|p| p.contains_key(key));
        if let Some(quota) = self.quota
            && !exists
            && state.entry_count() >= quota
        {
            return Err(Error::QuotaExceeded(quota));
        }

        state.next_seq += 1;
        let entry = CacheEntry {
            key: key.clone(),
            response: response.clone(),
            inserted_seq: state.next_seq,
            inserted_at: chrono::Utc::now().to_rfc3339(),
        };
        state
            .partitions
            .entry(partition.to_string())
            .or_default()
            .insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, partition: &str, key: &CacheKey) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        let Some(entries) = state.partitions.get_mut(partition) else {
            return Ok(false);
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            state.partitions.remove(partition);
        }
        Ok(removed)
    }

    async fn keys_ordered_by_insertion(&self, partition: &str) -> Result<Vec<CacheKey>, Error> {
        let state = self.state.read().await;
        let Some(entries) = state.partitions.get(partition) else {
            return Ok(Vec::new());
        };
        let mut ordered: Vec<&CacheEntry> = entries.values().collect();
        ordered.sort_by_key(|e| e.inserted_seq);
        Ok(ordered.into_iter().map(|e| e.key.clone()).collect())
    }

    async fn delete_cache(&self, partition: &str) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        Ok(state.partitions.remove(partition).is_some_and(|p| !p.is_empty()))
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state
            .partitions
            .iter()
            .filter(|(_, p)| !p.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn active_precache(&self, cache_id: &str) -> Result<Option<PrecacheRecord>, Error> {
        Ok(self.state.read().await.precache.get(cache_id).cloned())
    }

    async fn set_active_precache(&self, cache_id: &str, record: &PrecacheRecord) -> Result<(), Error> {
        self.state
            .write()
            .await
            .precache
            .insert(cache_id.to_string(), record.clone());
        Ok(())
    }
}

//! Precache Manager: stage, verify, and atomically swap the precache.
//!
//! ### Activation
//! - Build the new set in a fresh staging partition
//!   (`{cache_id}-precache-{version}-{stamp}`).
//! - Assets whose path and fingerprint match the active precache are copied
//!   from it; all others are fetched from the origin.
//! - Any fetch failure drops the staging partition and leaves the active
//!   precache untouched.
//! - On success the store pointer and the in-process designation are
//!   swapped together under a write lock, then the old partition is dropped.
//!
//! ### Lookups
//! Lookups hold the read side of the same lock for the whole read, so a
//! consumer sees either the old complete set or the new complete set.

use std::sync::Arc;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::Error;
use crate::cache::{CacheKey, CacheStore, PrecacheRecord};
use crate::manifest::{AssetEntry, PrecacheManifest};
use crate::routing::PRECACHE;
use crate::strategy::fetch_with_deadline;
use crate::transport::{Request, Response, Transport};

/// What an activation attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivationOutcome {
    Activated,
    AlreadyActive,
}

/// Summary of a finished activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub outcome: ActivationOutcome,
    pub version: String,
    pub partition: String,
    /// Assets fetched from the network.
    pub fetched: usize,
    /// Assets copied unchanged from the previous precache.
    pub reused: usize,
    /// Partition removed by the swap, if any.
    pub removed: Option<String>,
}

/// Owner of the precache partition for one cache id.
pub struct PrecacheManager {
    cache_id: String,
    origin: Url,
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    active: RwLock<Option<PrecacheRecord>>,
    activation: Mutex<()>,
}

impl PrecacheManager {
    /// Restore the active designation persisted in `store`.
    pub async fn load(
        cache_id: &str, origin: Url, store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>, timeout: Duration,
    ) -> Result<Self, Error> {
        let active = store.active_precache(cache_id).await?;
        if let Some(record) = &active {
            tracing::debug!(cache_id, version = %record.version, partition = %record.partition, "restored active precache");
        }
        Ok(Self {
            cache_id: cache_id.to_string(),
            origin,
            store,
            transport,
            timeout,
            active: RwLock::new(active),
            activation: Mutex::new(()),
        })
    }

    fn staging_prefix(&self) -> String {
        format!("{}-{PRECACHE}-", self.cache_id)
    }

    fn staging_partition(&self, version: &str) -> String {
        let short: String = version
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(12)
            .collect();
        format!("{}{short}-{}", self.staging_prefix(), chrono::Utc::now().timestamp_micros())
    }

    /// Absolute URL of an origin-relative asset path.
    pub fn asset_url(&self, path: &str) -> Result<Url, Error> {
        self.origin
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    /// Whether `url` is served by this precache's origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Version of the active precache.
    pub async fn active_version(&self) -> Option<String> {
        self.active.read().await.as_ref().map(|r| r.version.clone())
    }

    /// Read a precached asset by path.
    ///
    /// Returns `None` when nothing is active or the path is not part of the
    /// active manifest.
    pub async fn lookup(&self, path: &str) -> Result<Option<Response>, Error> {
        let active = self.active.read().await;
        let Some(record) = active.as_ref() else {
            return Ok(None);
        };
        if record.fingerprint_of(path).is_none() {
            return Ok(None);
        }
        let entry = self.store.get(&record.partition, &CacheKey::for_asset(path)).await?;
        Ok(entry.map(|e| e.response))
    }

    /// Read the precached asset a same-origin request `url` refers to.
    ///
    /// Manifest paths are stored as written, so the percent-encoded request
    /// path is decoded first; the encoded form is tried as well.
    pub async fn lookup_url(&self, url: &Url) -> Result<Option<Response>, Error> {
        if !self.is_same_origin(url) {
            return Ok(None);
        }
        let raw = url.path();
        let decoded = percent_decode_str(raw).decode_utf8_lossy();
        match self.lookup(&decoded).await? {
            Some(response) => Ok(Some(response)),
            None if decoded != raw => self.lookup(raw).await,
            None => Ok(None),
        }
    }

    /// Bring the precache into correspondence with `manifest`.
    ///
    /// # Errors
    ///
    /// Returns `Error::PrecacheFetch` if any asset cannot be fetched; the
    /// previously active precache stays in place and keeps serving.
    pub async fn activate(&self, manifest: &PrecacheManifest) -> Result<ActivationReport, Error> {
        let _activation = self.activation.lock().await;
        let current = self.active.read().await.clone();

        if let Some(record) = &current
            && record.version == manifest.version()
        {
            tracing::info!(version = %record.version, "precache already active");
            return Ok(ActivationReport {
                outcome: ActivationOutcome::AlreadyActive,
                version: record.version.clone(),
                partition: record.partition.clone(),
                fetched: 0,
                reused: 0,
                removed: None,
            });
        }

        self.remove_stale_staging(current.as_ref()).await;

        let staging = self.staging_partition(manifest.version());
        tracing::info!(version = %manifest.version(), partition = %staging, assets = manifest.entries().len(), "staging precache");

        let (fetched, reused) = match self.fill(&staging, manifest, current.as_ref()).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::error!(version = %manifest.version(), error = %e, "precache activation aborted");
                self.discard(&staging).await;
                return Err(e);
            }
        };

        let record = PrecacheRecord {
            partition: staging.clone(),
            version: manifest.version().to_string(),
            entries: manifest.entries().to_vec(),
            activated_at: chrono::Utc::now().to_rfc3339(),
        };

        let previous = {
            let mut active = self.active.write().await;
            if let Err(e) = self.store.set_active_precache(&self.cache_id, &record).await {
                drop(active);
                tracing::error!(version = %record.version, error = %e, "failed to record active precache");
                self.discard(&staging).await;
                return Err(e);
            }
            active.replace(record)
        };

        let removed = match previous {
            Some(old) => {
                if let Err(e) = self.store.delete_cache(&old.partition).await {
                    tracing::warn!(partition = %old.partition, error = %e, "failed to delete previous precache");
                }
                Some(old.partition)
            }
            None => None,
        };

        tracing::info!(version = %manifest.version(), partition = %staging, fetched, reused, "precache activated");

        Ok(ActivationReport {
            outcome: ActivationOutcome::Activated,
            version: manifest.version().to_string(),
            partition: staging,
            fetched,
            reused,
            removed,
        })
    }

    /// Populate `staging` with every manifest entry.
    async fn fill(
        &self, staging: &str, manifest: &PrecacheManifest, current: Option<&PrecacheRecord>,
    ) -> Result<(usize, usize), Error> {
        let mut fetched = 0;
        let mut reused = 0;

        for entry in manifest.entries() {
            let key = CacheKey::for_asset(&entry.path);

            if let Some(response) = self.reusable(entry, &key, current).await {
                self.store.put(staging, &key, &response).await?;
                reused += 1;
                continue;
            }

            let response = self.fetch_asset(entry).await?;
            self.store.put(staging, &key, &response).await?;
            fetched += 1;
        }

        Ok((fetched, reused))
    }

    /// Unchanged asset from the active precache, if present.
    async fn reusable(&self, entry: &AssetEntry, key: &CacheKey, current: Option<&PrecacheRecord>) -> Option<Response> {
        let record = current?;
        if record.fingerprint_of(&entry.path) != Some(entry.fingerprint.as_str()) {
            return None;
        }
        match self.store.get(&record.partition, key).await {
            Ok(found) => found.map(|e| e.response),
            Err(e) => {
                tracing::debug!(path = %entry.path, error = %e, "could not reuse precached asset; refetching");
                None
            }
        }
    }

    async fn fetch_asset(&self, entry: &AssetEntry) -> Result<Response, Error> {
        let fetch_error = |reason: String| Error::PrecacheFetch { path: entry.path.clone(), reason };

        let url = self.asset_url(&entry.path).map_err(|e| fetch_error(e.to_string()))?;
        let response = fetch_with_deadline(self.transport.as_ref(), &Request::get(url), self.timeout)
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.is_success() {
            return Err(fetch_error(format!("status {}", response.status)));
        }
        Ok(response)
    }

    async fn discard(&self, partition: &str) {
        if let Err(e) = self.store.delete_cache(partition).await {
            tracing::warn!(partition, error = %e, "failed to drop staging partition");
        }
    }

    /// Drop staging partitions left by interrupted activations.
    async fn remove_stale_staging(&self, current: Option<&PrecacheRecord>) {
        let partitions = match self.store.partitions().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "could not list partitions for cleanup");
                return;
            }
        };
        let prefix = self.staging_prefix();
        for partition in partitions {
            let is_active = current.is_some_and(|r| r.partition == partition);
            if partition.starts_with(&prefix) && !is_active {
                tracing::info!(partition = %partition, "removing stale precache staging partition");
                self.discard(&partition).await;
            }
        }
    }
}

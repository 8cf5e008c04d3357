//! Cache Store Adapter: partitioned key → response storage.
//!
//! Every operation is scoped to a single partition (a namespaced cache
//! name). Two backends are provided:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, persistent, WAL mode
//! - [`MemoryStore`]: in-process, optionally quota-bounded
//!
//! `put` overwrites an existing key and moves it to the newest insertion
//! position. Keys are listed oldest first.

pub mod connection;
pub mod entries;
pub mod key;
pub mod memory;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::{CacheKey, UrlError, canonicalize};
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::manifest::AssetEntry;
use crate::transport::Response;

/// A stored response together with its insertion position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub response: Response,
    /// Monotonic insertion sequence; larger is newer.
    pub inserted_seq: i64,
    /// RFC 3339 timestamp of the write.
    pub inserted_at: String,
}

/// The precache partition currently designated active for a cache id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheRecord {
    pub partition: String,
    pub version: String,
    pub entries: Vec<AssetEntry>,
    pub activated_at: String,
}

impl PrecacheRecord {
    /// Fingerprint recorded for `path`, if the asset is part of this precache.
    pub fn fingerprint_of(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.fingerprint.as_str())
    }
}

/// Uniform interface over named, persistent key → response stores.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up one entry.
    async fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error>;

    /// Insert or overwrite an entry, making it the newest in its partition.
    async fn put(&self, partition: &str, key: &CacheKey, response: &Response) -> Result<(), Error>;

    /// Delete one entry. Returns whether it existed.
    async fn delete(&self, partition: &str, key: &CacheKey) -> Result<bool, Error>;

    /// All keys of a partition, oldest insertion first.
    async fn keys_ordered_by_insertion(&self, partition: &str) -> Result<Vec<CacheKey>, Error>;

    /// Drop a whole partition. Returns whether it held any entry.
    async fn delete_cache(&self, partition: &str) -> Result<bool, Error>;

    /// Names of all non-empty partitions.
    async fn partitions(&self) -> Result<Vec<String>, Error>;

    /// The active precache designation for `cache_id`.
    async fn active_precache(&self, cache_id: &str) -> Result<Option<PrecacheRecord>, Error>;

    /// Redesignate the active precache for `cache_id` in one step.
    async fn set_active_precache(&self, cache_id: &str, record: &PrecacheRecord) -> Result<(), Error>;
}

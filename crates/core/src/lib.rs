//! Core of the offline cache worker.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite and in-memory backends
//! - Precache manifests and versioned activation
//! - Runtime route matching, network-first dispatch, and FIFO eviction
//! - Navigation fallback and the [`OfflineWorker`] that ties them together
//! - Unified error types and layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod fallback;
pub mod manifest;
pub mod precache;
pub mod routing;
pub mod strategy;
pub mod transport;
pub mod worker;

pub use cache::{CacheDb, CacheEntry, CacheKey, CacheStore, MemoryStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::{AssetEntry, PrecacheManifest};
pub use precache::{ActivationOutcome, ActivationReport, PrecacheManager};
pub use strategy::{ResponseSource, Served};
pub use transport::{Request, RequestMode, Response, Transport};
pub use worker::{FetchOutcome, OfflineWorker};

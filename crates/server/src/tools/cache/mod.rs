//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and purging runtime partitions.

pub mod get;
pub mod keys;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use keys::{CacheKeysParams, keys_impl};
pub use purge::{CachePurgeParams, purge_impl};

//! cache_keys tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::OfflineWorker;

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Logical cache name from `runtime_caching`.
    pub cache_name: String,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    /// Keys ordered oldest first; the first one is evicted next.
    pub keys: Vec<String>,
    pub max_entries: usize,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(worker: &OfflineWorker, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let keys = worker.runtime_keys(&params.cache_name).await?;
    let max_entries = worker
        .matcher()
        .route(&params.cache_name)
        .map(|r| r.max_entries.get())
        .unwrap_or_default();

    let output = CacheKeysOutput { keys: keys.iter().map(|k| k.to_string()).collect(), max_entries };
    json_result(&output)
}

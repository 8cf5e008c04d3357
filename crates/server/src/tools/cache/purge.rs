//! cache_purge tool implementation.
//!
//! Deletes every entry of one runtime partition.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::OfflineWorker;

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Logical cache name from `runtime_caching`.
    pub cache_name: String,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Whether the partition existed.
    pub purged: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &OfflineWorker, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let purged = worker.purge(&params.cache_name).await?;
    json_result(&CachePurgeOutput { purged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fetch::{SwFetchParams, fetch_impl};
    use crate::tools::testing::{parse_output, worker};
    use swkit_core::transport::testing::Reply;

    const ITEM: &str = "https://api.example.com/item/1.json";

    #[tokio::test]
    async fn test_purge_existing() {
        let (worker, transport) = worker().await;
        transport.reply(ITEM, Reply::Ok(200, "{}"));
        fetch_impl(&worker, SwFetchParams { url: ITEM.into(), method: "GET".into(), navigate: false })
            .await
            .unwrap();

        let params = CachePurgeParams { cache_name: "item-cache".into() };
        let output: CachePurgeOutput = parse_output(&purge_impl(&worker, params.clone()).await.unwrap());
        assert!(output.purged);

        let output: CachePurgeOutput = parse_output(&purge_impl(&worker, params).await.unwrap());
        assert!(!output.purged);
    }

    #[tokio::test]
    async fn test_purge_unknown_cache() {
        let (worker, _) = worker().await;
        let params = CachePurgeParams { cache_name: "nope".into() };
        assert!(purge_impl(&worker, params).await.is_err());
    }
}

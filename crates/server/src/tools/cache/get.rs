//! cache_get tool implementation.
//!
//! Retrieves one runtime entry by cache name and URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::cache::canonicalize;
use swkit_core::{Error, OfflineWorker};

use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Logical cache name from `runtime_caching`.
    pub cache_name: String,
    /// URL of the cached GET request.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub key: String,
    pub inserted_at: String,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &OfflineWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let entry = worker
        .runtime_entry(&params.cache_name, &url)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {}", url, params.cache_name)))?;

    let output = CacheGetOutput {
        key: entry.key.to_string(),
        inserted_at: entry.inserted_at,
        response: ResponseView::from(&entry.response),
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fetch::{SwFetchParams, fetch_impl};
    use crate::tools::testing::{parse_output, worker};
    use swkit_core::transport::testing::Reply;

    const ITEM: &str = "https://api.example.com/item/1.json";

    fn params(cache_name: &str) -> CacheGetParams {
        CacheGetParams { cache_name: cache_name.into(), url: ITEM.into() }
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (worker, _) = worker().await;
        let err = get_impl(&worker, params("item-cache")).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let (worker, transport) = worker().await;
        transport.reply(ITEM, Reply::Ok(200, "{\"id\":1}"));
        let fetch = SwFetchParams { url: ITEM.into(), method: "GET".into(), navigate: false };
        fetch_impl(&worker, fetch).await.unwrap();

        let output: CacheGetOutput = parse_output(&get_impl(&worker, params("item-cache")).await.unwrap());
        assert_eq!(output.key, format!("GET {ITEM}"));
        assert_eq!(output.response.body, "{\"id\":1}");
    }

    #[tokio::test]
    async fn test_get_impl_unknown_cache() {
        let (worker, _) = worker().await;
        let err = get_impl(&worker, params("nope")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}

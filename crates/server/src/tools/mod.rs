//! MCP tool implementations.
//!
//! This module contains all tools exposed by the sw-worker server.

pub mod activate;
pub mod cache;
pub mod fetch;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::{Error, Response};

/// A response as returned to MCP clients. Bodies are decoded as lossy UTF-8.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl From<&Response> for ResponseView {
    fn from(response: &Response) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }
    }
}

/// Serialize `output` as the single text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;
    use swkit_core::config::{RuntimeRoute, Strategy};
    use swkit_core::transport::testing::ScriptedTransport;
    use swkit_core::{AppConfig, MemoryStore, OfflineWorker};

    pub const ORIGIN: &str = "http://localhost:5001";

    pub async fn worker() -> (Arc<OfflineWorker>, Arc<ScriptedTransport>) {
        let config = AppConfig {
            cache_id: "test".into(),
            origin: ORIGIN.into(),
            runtime_caching: vec![RuntimeRoute {
                url_pattern: r"^https://api\.example\.com/item/".into(),
                strategy: Strategy::NetworkFirst,
                cache_name: "item-cache".into(),
                max_entries: 3,
            }],
            ..Default::default()
        };
        let transport = Arc::new(ScriptedTransport::new());
        let worker = OfflineWorker::open(&config, Arc::new(MemoryStore::new()), transport.clone())
            .await
            .unwrap();
        (Arc::new(worker), transport)
    }

    pub fn parse_output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}

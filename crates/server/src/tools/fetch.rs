//! sw_fetch tool implementation.
//!
//! Runs one request through the fetch interception path and reports where
//! the answer came from.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::cache::canonicalize;
use swkit_core::{Error, FetchOutcome, OfflineWorker, Request, RequestMode, ResponseSource};

use super::{ResponseView, json_result};

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL of the request.
    pub url: String,

    /// HTTP method (default: GET). Only GET is intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// False when the worker declined and the host should use the network.
    pub intercepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<(String, String)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl SwFetchOutput {
    fn pass_through() -> Self {
        Self { intercepted: false, source: None, status: None, headers: None, body: None }
    }

    fn served(source: ResponseSource, response: ResponseView) -> Self {
        Self {
            intercepted: true,
            source: Some(source),
            status: Some(response.status),
            headers: Some(response.headers),
            body: Some(response.body),
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &OfflineWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::Subresource };
    let request = Request::new(&params.method, url, mode);

    let output = match worker.handle_fetch(&request).await? {
        FetchOutcome::Respond(served) => SwFetchOutput::served(served.source, ResponseView::from(&served.response)),
        FetchOutcome::PassThrough => SwFetchOutput::pass_through(),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{ORIGIN, parse_output, worker};
    use swkit_core::transport::testing::Reply;

    const ITEM: &str = "https://api.example.com/item/9.json";

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), navigate: false }
    }

    #[tokio::test]
    async fn test_network_then_runtime_cache() {
        let (worker, transport) = worker().await;
        transport.reply(ITEM, Reply::Ok(200, "{\"id\":9}"));

        let output: SwFetchOutput = parse_output(&fetch_impl(&worker, params(ITEM)).await.unwrap());
        assert!(output.intercepted);
        assert_eq!(output.source, Some(ResponseSource::Network));

        transport.reply(ITEM, Reply::Fail);
        let output: SwFetchOutput = parse_output(&fetch_impl(&worker, params(ITEM)).await.unwrap());
        assert_eq!(output.source, Some(ResponseSource::RuntimeCache));
        assert_eq!(output.status, Some(200));
        assert_eq!(output.body.as_deref(), Some("{\"id\":9}"));
    }

    #[tokio::test]
    async fn test_pass_through() {
        let (worker, _) = worker().await;
        let output: SwFetchOutput =
            parse_output(&fetch_impl(&worker, params("https://cdn.example.com/x.css")).await.unwrap());
        assert!(!output.intercepted);
        assert!(output.source.is_none());
        assert!(output.status.is_none());
        assert!(output.body.is_none());
    }

    #[tokio::test]
    async fn test_post_passes_through() {
        let (worker, _) = worker().await;
        let params = SwFetchParams { url: ITEM.into(), method: "post".into(), navigate: false };
        let output: SwFetchOutput = parse_output(&fetch_impl(&worker, params).await.unwrap());
        assert!(!output.intercepted);
    }

    #[tokio::test]
    async fn test_miss_is_error() {
        let (worker, _) = worker().await;
        let err = fetch_impl(&worker, params(ITEM)).await.unwrap_err();
        assert_eq!(err.code.0, -32006);
    }

    #[tokio::test]
    async fn test_navigation_without_precache_fails() {
        let (worker, _) = worker().await;
        let params = SwFetchParams { url: format!("{ORIGIN}/news"), method: default_method(), navigate: true };
        assert!(fetch_impl(&worker, params).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let (worker, _) = worker().await;
        let err = fetch_impl(&worker, params("")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}

//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::activate::{ActivateParams, activate_impl};
use crate::tools::cache::{CacheGetParams, CacheKeysParams, CachePurgeParams, get_impl, keys_impl, purge_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swkit_core::OfflineWorker;

/// The main MCP server handler for sw-worker.
#[derive(Clone)]
pub struct SwWorkerServer {
    worker: Arc<OfflineWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwWorkerServer {
    /// Create a new server handler around a ready worker.
    pub fn new(worker: Arc<OfflineWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Activation event.
    #[tool(
        description = "Activate a precache manifest. Fetches new or changed assets into a staging cache and atomically swaps it in. No-op if the version is already active."
    )]
    async fn sw_activate(&self, params: Parameters<ActivateParams>) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker, params.0).await
    }

    /// Fetch interception event.
    #[tool(
        description = "Intercept a request. Returns the response and its source (network, runtime-cache, precache, fallback), or intercepted=false when the worker declines."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Read one cached runtime entry by cache name and URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "List the keys of a runtime cache, oldest first.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete every entry of a runtime cache.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for SwWorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sw-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

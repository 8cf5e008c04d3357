//! sw_activate tool implementation.
//!
//! Loads a precache manifest from disk and runs the activation event.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::{Error, OfflineWorker, PrecacheManifest};

use super::json_result;

/// Parameters for the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateParams {
    /// Path to the precache manifest JSON file.
    pub manifest_path: String,
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &OfflineWorker, params: ActivateParams) -> Result<CallToolResult, McpError> {
    if params.manifest_path.trim().is_empty() {
        return Err(Error::InvalidInput("manifest_path cannot be empty".into()).into());
    }

    let manifest = PrecacheManifest::load(&params.manifest_path)?;
    let report = worker.activate(&manifest).await?;
    json_result(&report)
}

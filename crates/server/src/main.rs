//! sw-worker server entry point.
//!
//! Boots the offline worker and serves it as an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swkit_client::{FetchClient, FetchConfig};
use swkit_core::{AppConfig, CacheDb, OfflineWorker};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(cache_id = %config.cache_id, db_path = %config.db_path.display(), "Starting sw-worker on stdio transport");

    let store = Arc::new(CacheDb::open(&config.db_path).await?);
    let transport = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config))?);
    let worker = OfflineWorker::open(&config, store, transport).await?;

    let handler = handler::SwWorkerServer::new(Arc::new(worker));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}

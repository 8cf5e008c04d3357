//! swkit command line: manifest generation and one-shot worker events.
//!
//! Logging goes to stderr; command output goes to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use swkit_client::{FetchClient, FetchConfig};
use swkit_core::cache::canonicalize;
use swkit_core::{AppConfig, CacheDb, FetchOutcome, OfflineWorker, PrecacheManifest, Request, RequestMode};
use tracing_subscriber::EnvFilter;

mod manifest;

#[derive(Parser)]
#[command(name = "swkit", about = "Offline cache worker utilities", version)]
struct Cli {
    /// Raise the log level (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a precache manifest for a build output directory
    Manifest {
        /// Directory to scan
        dir: PathBuf,
        /// Write the manifest here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the activation event for a manifest
    Activate {
        /// Path to the manifest JSON
        manifest: PathBuf,
    },
    /// Run one request through fetch interception
    Fetch {
        url: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,
    },
}

async fn open_worker(config: &AppConfig) -> Result<OfflineWorker> {
    let store = Arc::new(
        CacheDb::open(&config.db_path)
            .await
            .with_context(|| format!("failed to open {}", config.db_path.display()))?,
    );
    let transport = Arc::new(FetchClient::new(FetchConfig::from_app_config(config))?);
    Ok(OfflineWorker::open(config, store, transport).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Commands::Manifest { dir, output } => {
            let json = manifest::generate(&dir, &config.precache_exclusions)?.to_json()?;
            match output {
                Some(path) => std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Commands::Activate { manifest } => {
            let manifest = PrecacheManifest::load(&manifest)?;
            let worker = open_worker(&config).await?;
            let report = worker.activate(&manifest).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Fetch { url, method, navigate } => {
            let url = canonicalize(&url)?;
            let mode = if navigate { RequestMode::Navigate } else { RequestMode::Subresource };
            let worker = open_worker(&config).await?;

            let outcome = worker.handle_fetch(&Request::new(&method, url, mode)).await;
            worker.settle().await?;

            match outcome? {
                FetchOutcome::Respond(served) => {
                    let response = &served.response;
                    let summary = serde_json::json!({
                        "intercepted": true,
                        "source": served.source,
                        "status": response.status,
                        "headers": response.headers,
                        "body": String::from_utf8_lossy(&response.body),
                    });
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                FetchOutcome::PassThrough => println!("{}", serde_json::json!({ "intercepted": false })),
            }
        }
    }

    Ok(())
}

//! Murmur broadcast node
//!
//! Speaks line-delimited JSON on stdin/stdout: waits for `init`, serves
//! `broadcast`, `read`, `topology` and `sync`, and gossips with its
//! neighbors on a fixed schedule. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use murmur_anti_entropy::{GossipNode, SyncScheduler};
use murmur_transport::StdioRuntime;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod config;

use config::NodeConfig;

#[derive(Parser)]
#[command(name = "murmur-node")]
#[command(about = "Anti-entropy broadcast node", long_about = None)]
struct Cli {
    /// Config file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds between sync rounds
    #[arg(long)]
    sync_interval_ms: Option<u64>,

    /// Milliseconds an outbound sync waits for its reply
    #[arg(long)]
    rpc_timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn node_config(&self) -> Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };
        if let Some(ms) = self.sync_interval_ms {
            config.sync_interval_ms = ms;
        }
        if let Some(ms) = self.rpc_timeout_ms {
            config.rpc_timeout_ms = ms;
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    // stdout carries protocol traffic; logs must stay on stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = StdioRuntime::handshake(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        config.stdio(),
    )
    .await
    .context("init handshake")?;

    let node = GossipNode::new(runtime.transport());
    let router = Arc::new(node.router());
    let scheduler = SyncScheduler::new(Arc::clone(&node), &config.anti_entropy())?.spawn();

    let served = runtime.serve(router).await;
    scheduler.shutdown().await;

    tracing::info!(node = %node.node_id(), stats = ?node.stats(), "Node stopped");
    served.context("serving stdin")?;
    Ok(())
}

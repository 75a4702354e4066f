//! Mocknest server entry point.
//!
//! Loads the YAML configuration, seeds the in-memory store with the project
//! definitions it carries, starts the metrics exporter, and runs the mock
//! execution server until interrupted.

use clap::Parser;
use mocknest_server::config::Config;
use mocknest_server::metrics;
use mocknest_server::server::ExecutionServer;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "mocknest-server")]
#[command(author, version, about = "Mock-API hosting execution server")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "MOCKNEST_CONFIG")]
    config: String,

    /// Override the listen port from the configuration file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::from_file(&args.config)?;
    if let Some(port) = args.port {
        config.listen.port = port;
    }

    info!(
        "Loaded {} project(s) from {}",
        config.projects.len(),
        args.config
    );

    let store = Arc::new(config.seed_store());

    let metrics_port = config.metrics.port;
    tokio::spawn(async move {
        if let Err(err) = metrics::serve(metrics_port).await {
            error!("Metrics exporter failed: {err}");
        }
    });

    let server = ExecutionServer::new(config, store);

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    }
}

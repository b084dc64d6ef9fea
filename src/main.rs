//! Roulette Royale API server

use clap::Parser;
use roulette_royale::{
    api::{build_state, ApiServer},
    config::{generate_sample_config, ConfigLoader, StorageBackend},
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "royale-server")]
#[command(about = "Roulette Royale game server", long_about = None)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,

    /// Override the account database directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Keep accounts in memory only
    #[arg(long)]
    memory: bool,

    /// Write a sample configuration to this path and exit
    #[arg(long)]
    generate_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(path) = &args.generate_config {
        generate_sample_config(path)?;
        println!("📝 Sample configuration written to {}", path);
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_directory = data_dir;
    }
    if args.memory {
        config.storage.backend = StorageBackend::Memory;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.monitoring.log_level.filter_directive())),
        )
        .init();

    let state = build_state(&config).await?;
    ApiServer::new(config, state).run().await
}

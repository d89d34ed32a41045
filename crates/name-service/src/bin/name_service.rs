use clap::Parser;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::info;

use dfs_common::config::load_config;
use dfs_proto::name_service::name_service_server::NameServiceServer;
use name_service::{Catalog, NameServiceImpl};

/// Name Service: metadata catalog, liveness registry, placement decisions.
#[derive(Parser, Debug)]
#[command(name = "name-service")]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Discard any existing snapshot and start with empty metadata.
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    if args.reset && std::path::Path::new(&config.name_service.snapshot_path).exists() {
        std::fs::remove_file(&config.name_service.snapshot_path)?;
        info!("removed existing snapshot at {}", config.name_service.snapshot_path);
    }

    let catalog = Arc::new(Catalog::new(config.name_service.snapshot_path.clone()));
    catalog.load_snapshot().await;
    catalog.spawn_snapshot_task();

    let addr = config.name_service.bind_addr.parse()?;
    info!("NameService listening on {}", addr);

    let service = NameServiceImpl { catalog };
    Server::builder()
        .add_service(NameServiceServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}

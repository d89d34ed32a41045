use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tonic::Request;
use tonic::transport::Server;
use tracing::info;

use data_node::{DataNodeService, PathLocks};
use dfs_common::config::load_config;
use dfs_proto::chunk_transport::data_node_server::DataNodeServer;
use dfs_proto::name_service::name_service_client::NameServiceClient;
use dfs_proto::name_service::NotifyAvailabilityArgs;

/// Data Node: persists chunks locally, forwards writes to replica peers,
/// serves reads and deletes.
#[derive(Parser, Debug)]
#[command(name = "data-node")]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Address this node binds to and advertises to the Name Service.
    #[arg(short, long)]
    address: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    let data_path = PathBuf::from(&config.data_node.data_path).join(args.address.replace(':', "_"));
    std::fs::create_dir_all(&data_path)?;
    info!("data directory: {:?}", data_path);

    let mut ns = NameServiceClient::connect(format!("http://{}", config.common.name_service_addr))
        .await?;
    ns.notify_data_node_availability(Request::new(NotifyAvailabilityArgs {
        address: args.address.clone(),
    }))
    .await?;
    info!("registered with name service at {}", config.common.name_service_addr);

    let service = DataNodeService {
        self_addr: args.address.clone(),
        data_path,
        name_service_addr: config.common.name_service_addr.clone(),
        locks: Arc::new(PathLocks::new()),
    };

    let addr = args.address.parse()?;
    info!("DataNode listening on {}", addr);

    Server::builder()
        .add_service(DataNodeServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}

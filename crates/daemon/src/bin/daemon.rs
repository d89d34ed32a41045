use clap::Parser;
use tonic::transport::Server;
use tracing::info;

use dfs_common::config::load_config;
use dfs_proto::job::daemon_server::DaemonServer;
use dfs_proto::name_service::name_service_client::NameServiceClient;
use dfs_proto::name_service::NotifyAvailabilityArgs;
use tonic::Request;

use daemon::DaemonService;

/// Daemon: co-located with a Data Node on each worker host, executes map
/// tasks against local chunks.
#[derive(Parser, Debug)]
#[command(name = "daemon")]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Address this daemon binds to and advertises to the Name Service.
    #[arg(long)]
    address: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    let mut ns = NameServiceClient::connect(format!("http://{}", config.common.name_service_addr))
        .await?;
    ns.notify_daemon_availability(Request::new(NotifyAvailabilityArgs {
        address: args.address.clone(),
    }))
    .await?;

    let addr = args.address.parse()?;
    info!("Daemon listening on {}", addr);

    let service = DaemonService {
        job_manager_addr: config.common.job_manager_addr,
    };

    Server::builder()
        .add_service(DaemonServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}

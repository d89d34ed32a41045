use clap::Parser;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::info;

use dfs_common::config::load_config;
use dfs_proto::job::job_manager_server::JobManagerServer;
use job_manager::{JobManagerService, JobRegistry};

/// Job Manager: tracks per-job task counters and completion tallies.
#[derive(Parser, Debug)]
#[command(name = "job-manager")]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    let registry = Arc::new(JobRegistry::new());
    let addr = config.job_manager.bind_addr.parse()?;
    info!("JobManager listening on {}", addr);

    let service = JobManagerService {
        registry,
        name_service_addr: config.common.name_service_addr,
    };

    Server::builder()
        .add_service(JobManagerServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}

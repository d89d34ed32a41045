use clap::Parser;
use std::path::PathBuf;

use dfs_common::config::load_config;
use dfs_common::record::RecordFormat;
use job_client::JobClient;

/// Job Client: submits a map/reduce job, dispatches maps to co-located
/// Daemons, waits for the barrier, runs the reduce locally.
#[derive(Parser, Debug)]
#[command(name = "job-client")]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Pre-deployed job identifier (e.g. "word_count").
    job_kind: String,

    #[arg(long, default_value = "line")]
    input_format: String,

    /// Omit for a generator job (parallelism = number of live daemons).
    #[arg(long)]
    input_file: Option<String>,

    /// Name the job's intermediate map-output file is registered under.
    #[arg(long, default_value = "job-output")]
    output_file: String,

    /// Local path the reduced result is written to.
    reduce_output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    let input_format = RecordFormat::parse(&args.input_format)
        .ok_or_else(|| format!("unknown record format {}", args.input_format))?;

    let client = JobClient {
        name_service_addr: config.common.name_service_addr,
        job_manager_addr: config.common.job_manager_addr,
        data_node_data_path: PathBuf::from(config.data_node.data_path),
        daemon_work_path: PathBuf::from(config.daemon.work_path),
        replication_factor: config.common.replication_factor as u32,
        chunk_size: config.common.chunk_size,
        barrier_poll_interval_ms: config.common.barrier_poll_interval_ms,
    };

    client
        .run(
            &args.job_kind,
            input_format,
            args.input_file.as_deref(),
            &args.output_file,
            &args.reduce_output,
        )
        .await?;

    println!("job complete: {:?}", args.reduce_output);
    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dfs_client::HdfsClient;
use dfs_common::config::load_config;
use dfs_common::record::RecordFormat;

#[derive(Parser, Debug)]
#[command(name = "hdfs")]
struct Cli {
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a local file into chunks and write it to the store.
    Write {
        format: String,
        path: PathBuf,
    },
    /// Reassemble a stored file into a local path.
    Read {
        hdfs_name: String,
        local_dest: PathBuf,
    },
    /// Delete a stored file and all of its chunks.
    Delete { hdfs_name: String },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("hdfs: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let client = HdfsClient {
        name_service_addr: config.common.name_service_addr,
        chunk_size: config.common.chunk_size,
        replication_factor: config.common.replication_factor as u32,
    };

    match cli.command {
        Command::Write { format, path } => {
            let format = RecordFormat::parse(&format)
                .ok_or_else(|| format!("unknown record format {}", format))?;
            let hdfs_name = path
                .file_name()
                .ok_or("path has no file name")?
                .to_string_lossy()
                .to_string();
            client.write(format, &path, &hdfs_name).await?;
        }
        Command::Read {
            hdfs_name,
            local_dest,
        } => {
            client.read(&hdfs_name, &local_dest).await?;
        }
        Command::Delete { hdfs_name } => {
            client.delete(&hdfs_name).await?;
        }
    }

    Ok(())
}

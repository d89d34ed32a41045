use std::path::{Path, PathBuf};
use std::time::Duration;

use tonic::Request;
use tracing::info;

use dfs_client::HdfsClient;
use dfs_common::record::RecordFormat;
use dfs_common::{resolve_job, DfsError};
use dfs_proto::job::daemon_client::DaemonClient;
use dfs_proto::job::job_manager_client::JobManagerClient;
use dfs_proto::job::{
    AddJobArgs, AvailableDaemonsArgs, CompletedMapsArgs, RunMapArgs, StartJobArgs, SubmitMapArgs,
};
use dfs_proto::name_service::name_service_client::NameServiceClient;
use dfs_proto::name_service::{ReadFileRequestArgs, WriteChunkRequestArgs};

use crate::locality::find_colocated_daemon;

/// Thin orchestrator: submits a job to the Job Manager, routes map tasks to
/// co-located Daemons, waits out the completion barrier, and runs the
/// reduce locally.
pub struct JobClient {
    pub name_service_addr: String,
    pub job_manager_addr: String,
    pub data_node_data_path: PathBuf,
    pub daemon_work_path: PathBuf,
    pub replication_factor: u32,
    pub chunk_size: u64,
    pub barrier_poll_interval_ms: u64,
}

impl JobClient {
    async fn ns(&self) -> Result<NameServiceClient<tonic::transport::Channel>, DfsError> {
        Ok(NameServiceClient::connect(format!("http://{}", self.name_service_addr)).await?)
    }

    async fn jm(&self) -> Result<JobManagerClient<tonic::transport::Channel>, DfsError> {
        Ok(JobManagerClient::connect(format!("http://{}", self.job_manager_addr)).await?)
    }

    /// Runs `job_kind` end to end and writes the reduced output to
    /// `local_reduce_output`. `input_file_name` is `None` for a generator
    /// job, whose parallelism equals the number of live Daemons.
    pub async fn run(
        &self,
        job_kind: &str,
        input_format: RecordFormat,
        input_file_name: Option<&str>,
        output_file_name: &str,
        local_reduce_output: &Path,
    ) -> Result<(), DfsError> {
        if resolve_job(job_kind).is_none() {
            return Err(DfsError::UnknownFile(format!("unknown job kind {}", job_kind)));
        }

        let mut ns = self.ns().await?;
        let mut jm = self.jm().await?;

        let job_id = jm
            .add_job(Request::new(AddJobArgs {
                job_kind: job_kind.to_string(),
                input_format: input_format.as_str().to_string(),
                input_file_name: input_file_name.unwrap_or("").to_string(),
            }))
            .await?
            .into_inner()
            .job_id;
        jm.start_job(Request::new(StartJobArgs { job_id })).await?;
        info!("started job {} ({})", job_id, job_kind);

        let daemons = jm
            .available_daemons(Request::new(AvailableDaemonsArgs {}))
            .await?
            .into_inner()
            .daemons;
        if daemons.is_empty() {
            return Err(DfsError::NoDaemons);
        }

        let (input_hosts, input_stem, input_ext) = match input_file_name {
            Some(name) => {
                let (stem, ext) = dfs_client::naming::split_name(name);
                let hosts = ns
                    .read_file_request(Request::new(ReadFileRequestArgs {
                        file_name: stem.to_string(),
                    }))
                    .await?
                    .into_inner()
                    .hosts;
                (Some(hosts), stem.to_string(), ext.to_string())
            }
            None => (None, String::new(), String::new()),
        };

        let nb_maps = match &input_hosts {
            Some(hosts) => hosts.len(),
            None => daemons.len(),
        };

        let mut output_paths = Vec::with_capacity(nb_maps);
        for i in 0..nb_maps as u64 {
            jm.submit_map(Request::new(SubmitMapArgs {
                job_id,
                map_index: i,
            }))
            .await?;

            let (target_daemon, input_path) = match &input_hosts {
                Some(hosts) => {
                    let dn_addr = &hosts[i as usize];
                    let daemon = find_colocated_daemon(dn_addr, &daemons)
                        .ok_or_else(|| DfsError::LocalityUnsatisfied(output_file_name.to_string()))?
                        .to_string();
                    let chunk_dir = self.data_node_data_path.join(dn_addr.replace(':', "_"));
                    let path = chunk_dir.join(format!("{}-{}{}", input_stem, i, input_ext));
                    (daemon, path.to_string_lossy().to_string())
                }
                None => {
                    let daemon = daemons[i as usize].clone();
                    (daemon, String::new())
                }
            };

            let work_dir = self.daemon_work_path.join(target_daemon.replace(':', "_"));
            tokio::fs::create_dir_all(&work_dir).await?;
            let output_path = work_dir.join(format!("{}-{}.kv", job_id, i));

            let mut daemon_client =
                DaemonClient::connect(format!("http://{}", target_daemon)).await?;
            daemon_client
                .run_map(Request::new(RunMapArgs {
                    job_id,
                    map_index: i,
                    job_kind: job_kind.to_string(),
                    input_format: input_format.as_str().to_string(),
                    input_path,
                    output_path: output_path.to_string_lossy().to_string(),
                }))
                .await?;

            output_paths.push(output_path);
        }

        self.barrier(&mut jm, job_id, nb_maps as u64).await?;
        info!("job {} barrier cleared ({} maps)", job_id, nb_maps);

        for (i, path) in output_paths.iter().enumerate() {
            let data = tokio::fs::read(path).await?;
            let hosts = ns
                .write_chunk_request(Request::new(WriteChunkRequestArgs {
                    replication_factor: self.replication_factor,
                }))
                .await?
                .into_inner()
                .hosts;
            if hosts.is_empty() {
                return Err(DfsError::NoDataNodes);
            }
            dfs_client::transport::write_chunk(
                dfs_client::transport::ChunkPlacement {
                    host: hosts[0].clone(),
                    file_name: output_file_name.to_string(),
                    extension: ".kv".to_string(),
                    chunk_number: i as u64,
                    replication_factor: hosts.len() as u32,
                    peers: hosts[1..].to_vec(),
                    file_size: data.len() as u64,
                    chunk_size: self.chunk_size,
                },
                data,
            )
            .await?;
        }
        ns.all_chunks_written(Request::new(
            dfs_proto::name_service::AllChunksWrittenArgs {
                file_name: output_file_name.to_string(),
            },
        ))
        .await?;

        let hdfs_client = HdfsClient {
            name_service_addr: self.name_service_addr.clone(),
            chunk_size: self.chunk_size,
            replication_factor: self.replication_factor,
        };
        let shuffle_tmp = self
            .daemon_work_path
            .join(format!("{}-shuffle.kv", job_id));
        hdfs_client
            .read(&format!("{}.kv", output_file_name), &shuffle_tmp)
            .await?;

        let job = resolve_job(job_kind)
            .ok_or_else(|| DfsError::UnknownFile(format!("unknown job kind {}", job_kind)))?;
        {
            let mut reader = RecordFormat::Kv.open_reader(&shuffle_tmp)?;
            let mut writer = RecordFormat::Kv.create_writer(local_reduce_output)?;
            job.reduce(reader.as_mut(), writer.as_mut())?;
        }
        tokio::fs::remove_file(&shuffle_tmp).await.ok();

        Ok(())
    }

    async fn barrier(
        &self,
        jm: &mut JobManagerClient<tonic::transport::Channel>,
        job_id: u64,
        nb_maps: u64,
    ) -> Result<(), DfsError> {
        loop {
            let completed = jm
                .completed_maps(Request::new(CompletedMapsArgs { job_id }))
                .await?
                .into_inner()
                .completed;
            if completed >= nb_maps {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(self.barrier_poll_interval_ms)).await;
        }
    }
}

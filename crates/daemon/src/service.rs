use tonic::{Request, Response, Status};
use tracing::{error, info};

use dfs_common::record::RecordFormat;
use dfs_common::resolve_job;
use dfs_proto::job::daemon_server::Daemon as DaemonTrait;
use dfs_proto::job::job_manager_client::JobManagerClient;
use dfs_proto::job::{MapCompletedArgs, RunMapArgs, RunMapReply};

pub struct DaemonService {
    pub job_manager_addr: String,
}

impl DaemonService {
    async fn run_map_task(&self, args: RunMapArgs) -> Result<(), Status> {
        let job = resolve_job(&args.job_kind)
            .ok_or_else(|| Status::invalid_argument(format!("unknown job kind {}", args.job_kind)))?;
        let input_format = RecordFormat::parse(&args.input_format)
            .ok_or_else(|| Status::invalid_argument(format!("unknown format {}", args.input_format)))?;

        // Map output is always key/value: it feeds the reduce step's Kv reader.
        let result: std::io::Result<()> = (|| {
            let mut writer = RecordFormat::Kv.create_writer(&args.output_path)?;
            if args.input_path.is_empty() {
                job.map(&mut dfs_common::record::NullReader, writer.as_mut())?;
            } else {
                let mut reader = input_format.open_reader(&args.input_path)?;
                job.map(reader.as_mut(), writer.as_mut())?;
            }
            writer.flush()
        })();

        if let Err(e) = result {
            error!("map {} of job {} failed: {}", args.map_index, args.job_id, e);
            return Err(Status::internal(format!("map failed: {}", e)));
        }

        let mut jm = JobManagerClient::connect(format!("http://{}", self.job_manager_addr))
            .await
            .map_err(|e| Status::unavailable(format!("cannot reach job manager: {}", e)))?;
        jm.map_completed(Request::new(MapCompletedArgs {
            job_id: args.job_id,
            map_index: args.map_index,
        }))
        .await?;

        Ok(())
    }
}

#[tonic::async_trait]
impl DaemonTrait for DaemonService {
    async fn run_map(
        &self,
        request: Request<RunMapArgs>,
    ) -> Result<Response<RunMapReply>, Status> {
        let args = request.into_inner();
        let job_id = args.job_id;
        let map_index = args.map_index;
        info!("accepted map {} of job {}", map_index, job_id);

        let job_manager_addr = self.job_manager_addr.clone();
        let daemon = DaemonService { job_manager_addr };
        tokio::spawn(async move {
            if let Err(e) = daemon.run_map_task(args).await {
                error!("map {} of job {} did not complete: {}", map_index, job_id, e);
            }
        });

        Ok(Response::new(RunMapReply { accepted: true }))
    }
}

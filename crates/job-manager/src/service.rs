use std::sync::Arc;
use tonic::{Request, Response, Status};

use dfs_proto::job::job_manager_server::JobManager;
use dfs_proto::job::{
    AddJobArgs, AddJobReply, AvailableDaemonsArgs, AvailableDaemonsReply, CompletedMapsArgs,
    CompletedMapsReply, MapCompletedArgs, MapCompletedReply, StartJobArgs, StartJobReply,
    SubmitMapArgs, SubmitMapReply,
};
use dfs_proto::name_service::name_service_client::NameServiceClient;
use dfs_proto::name_service::GetAvailableDaemonsArgs;

use crate::jobs::JobRegistry;

pub struct JobManagerService {
    pub registry: Arc<JobRegistry>,
    pub name_service_addr: String,
}

#[tonic::async_trait]
impl JobManager for JobManagerService {
    async fn add_job(
        &self,
        request: Request<AddJobArgs>,
    ) -> Result<Response<AddJobReply>, Status> {
        let args = request.into_inner();
        let input_file_name = if args.input_file_name.is_empty() {
            None
        } else {
            Some(args.input_file_name)
        };
        let job_id = self
            .registry
            .add_job(args.job_kind, args.input_format, input_file_name)
            .await;
        Ok(Response::new(AddJobReply { job_id }))
    }

    async fn start_job(
        &self,
        request: Request<StartJobArgs>,
    ) -> Result<Response<StartJobReply>, Status> {
        let job_id = request.into_inner().job_id;
        if !self.registry.start_job(job_id).await {
            return Err(Status::not_found(format!("unknown job {}", job_id)));
        }
        Ok(Response::new(StartJobReply {}))
    }

    async fn submit_map(
        &self,
        request: Request<SubmitMapArgs>,
    ) -> Result<Response<SubmitMapReply>, Status> {
        let job_id = request.into_inner().job_id;
        if !self.registry.submit_map(job_id).await {
            return Err(Status::not_found(format!("unknown job {}", job_id)));
        }
        Ok(Response::new(SubmitMapReply {}))
    }

    async fn map_completed(
        &self,
        request: Request<MapCompletedArgs>,
    ) -> Result<Response<MapCompletedReply>, Status> {
        let job_id = request.into_inner().job_id;
        if !self.registry.map_completed(job_id).await {
            return Err(Status::not_found(format!("unknown job {}", job_id)));
        }
        Ok(Response::new(MapCompletedReply {}))
    }

    async fn completed_maps(
        &self,
        request: Request<CompletedMapsArgs>,
    ) -> Result<Response<CompletedMapsReply>, Status> {
        let job_id = request.into_inner().job_id;
        let completed = self
            .registry
            .completed_maps(job_id)
            .await
            .ok_or_else(|| Status::not_found(format!("unknown job {}", job_id)))?;
        Ok(Response::new(CompletedMapsReply { completed }))
    }

    async fn available_daemons(
        &self,
        _request: Request<AvailableDaemonsArgs>,
    ) -> Result<Response<AvailableDaemonsReply>, Status> {
        let mut ns = NameServiceClient::connect(format!("http://{}", self.name_service_addr))
            .await
            .map_err(|e| Status::unavailable(format!("cannot reach name service: {}", e)))?;
        let reply = ns
            .get_available_daemons(Request::new(GetAvailableDaemonsArgs {}))
            .await?
            .into_inner();
        Ok(Response::new(AvailableDaemonsReply {
            daemons: reply.daemons,
        }))
    }
}

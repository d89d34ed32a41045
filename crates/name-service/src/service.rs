use std::sync::Arc;
use tonic::{Request, Response, Status};

use dfs_proto::name_service::name_service_server::NameService;
use dfs_proto::name_service::{
    AllChunksWrittenArgs, AllChunksWrittenReply, ChunkAssignment, ChunkDeletedArgs,
    ChunkDeletedReply, ChunkWrittenArgs, ChunkWrittenReply, DeleteFileRequestArgs,
    DeleteFileRequestReply, GetAvailableDaemonsArgs, GetAvailableDaemonsReply,
    NotifyAvailabilityArgs, NotifyAvailabilityReply, ReadFileRequestArgs, ReadFileRequestReply,
    WriteChunkRequestArgs, WriteChunkRequestReply,
};

use crate::catalog::Catalog;

pub struct NameServiceImpl {
    pub catalog: Arc<Catalog>,
}

#[tonic::async_trait]
impl NameService for NameServiceImpl {
    async fn write_chunk_request(
        &self,
        request: Request<WriteChunkRequestArgs>,
    ) -> Result<Response<WriteChunkRequestReply>, Status> {
        let r = request.into_inner().replication_factor;
        let hosts = self.catalog.write_chunk_request(r).await?;
        Ok(Response::new(WriteChunkRequestReply { hosts }))
    }

    async fn read_file_request(
        &self,
        request: Request<ReadFileRequestArgs>,
    ) -> Result<Response<ReadFileRequestReply>, Status> {
        let file_name = request.into_inner().file_name;
        let hosts = self.catalog.read_file_request(&file_name).await?;
        Ok(Response::new(ReadFileRequestReply { hosts }))
    }

    async fn delete_file_request(
        &self,
        request: Request<DeleteFileRequestArgs>,
    ) -> Result<Response<DeleteFileRequestReply>, Status> {
        let file_name = request.into_inner().file_name;
        let (hosts, assignments) = self.catalog.delete_file_request(&file_name).await?;
        Ok(Response::new(DeleteFileRequestReply {
            hosts,
            assignments: assignments
                .into_iter()
                .map(|(chunk_number, host)| ChunkAssignment { chunk_number, host })
                .collect(),
        }))
    }

    async fn chunk_written(
        &self,
        request: Request<ChunkWrittenArgs>,
    ) -> Result<Response<ChunkWrittenReply>, Status> {
        let args = request.into_inner();
        self.catalog
            .chunk_written(
                &args.file_name,
                args.file_size,
                args.chunk_size,
                args.replication_factor,
                args.chunk_number,
                &args.server,
            )
            .await;
        Ok(Response::new(ChunkWrittenReply {}))
    }

    async fn all_chunks_written(
        &self,
        request: Request<AllChunksWrittenArgs>,
    ) -> Result<Response<AllChunksWrittenReply>, Status> {
        let file_name = request.into_inner().file_name;
        self.catalog.all_chunks_written(&file_name).await;
        Ok(Response::new(AllChunksWrittenReply {}))
    }

    async fn chunk_deleted(
        &self,
        request: Request<ChunkDeletedArgs>,
    ) -> Result<Response<ChunkDeletedReply>, Status> {
        let args = request.into_inner();
        self.catalog
            .chunk_deleted(&args.file_name, args.chunk_number, &args.server)
            .await;
        Ok(Response::new(ChunkDeletedReply {}))
    }

    async fn notify_data_node_availability(
        &self,
        request: Request<NotifyAvailabilityArgs>,
    ) -> Result<Response<NotifyAvailabilityReply>, Status> {
        let addr = request.into_inner().address;
        self.catalog.notify_data_node_availability(addr).await;
        Ok(Response::new(NotifyAvailabilityReply {}))
    }

    async fn notify_daemon_availability(
        &self,
        request: Request<NotifyAvailabilityArgs>,
    ) -> Result<Response<NotifyAvailabilityReply>, Status> {
        let addr = request.into_inner().address;
        self.catalog.notify_daemon_availability(addr).await;
        Ok(Response::new(NotifyAvailabilityReply {}))
    }

    async fn get_available_daemons(
        &self,
        _request: Request<GetAvailableDaemonsArgs>,
    ) -> Result<Response<GetAvailableDaemonsReply>, Status> {
        let daemons = self.catalog.available_daemons().await?;
        Ok(Response::new(GetAvailableDaemonsReply {
            daemons: daemons.into_iter().collect(),
        }))
    }
}

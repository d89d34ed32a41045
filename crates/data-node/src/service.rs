use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_stream::StreamExt;
use tonic::{Request, Response, Status, Streaming};
use tracing::{error, info, warn};

use dfs_proto::chunk_transport::data_node_server::DataNode as DataNodeTrait;
use dfs_proto::chunk_transport::write_chunk::Payload;
use dfs_proto::chunk_transport::{
    DeleteChunkAck, DeleteChunkArgs, ReadChunkArgs, ReadChunkFrame, WriteChunk, WriteChunkAck,
    WriteHeader,
};
use dfs_proto::chunk_transport::data_node_client::DataNodeClient;

use dfs_proto::name_service::name_service_client::NameServiceClient;
use dfs_proto::name_service::{ChunkDeletedArgs, ChunkWrittenArgs};

use crate::store::{chunk_path, PathLocks};

pub struct DataNodeService {
    pub self_addr: String,
    pub data_path: PathBuf,
    pub name_service_addr: String,
    pub locks: Arc<PathLocks>,
}

type ReadStream = Pin<Box<dyn Stream<Item = Result<ReadChunkFrame, Status>> + Send>>;

impl DataNodeService {
    async fn ns_client(&self) -> Result<NameServiceClient<tonic::transport::Channel>, Status> {
        NameServiceClient::connect(format!("http://{}", self.name_service_addr))
            .await
            .map_err(|e| Status::unavailable(format!("cannot reach name service: {}", e)))
    }

    async fn forward_to_peers(&self, header: &WriteHeader, data: Vec<u8>) {
        for peer in &header.peers {
            let peer = peer.clone();
            let file_name = header.file_name.clone();
            let extension = header.extension.clone();
            let chunk_number = header.chunk_number;
            let data = data.clone();
            match DataNodeClient::connect(format!("http://{}", peer)).await {
                Ok(mut client) => {
                    let frames = vec![
                        WriteChunk {
                            payload: Some(Payload::Header(WriteHeader {
                                file_name,
                                extension,
                                chunk_number,
                                replication_factor: 1,
                                peers: vec![],
                                file_size: header.file_size,
                                chunk_size: header.chunk_size,
                            })),
                        },
                        WriteChunk {
                            payload: Some(Payload::Data(data)),
                        },
                    ];
                    if let Err(e) = client
                        .write(Request::new(tokio_stream::iter(frames)))
                        .await
                    {
                        warn!("peer write to {} failed: {}", peer, e);
                    }
                }
                Err(e) => warn!("failed to connect to peer {}: {}", peer, e),
            }
        }
    }
}

#[tonic::async_trait]
impl DataNodeTrait for DataNodeService {
    async fn write(
        &self,
        request: Request<Streaming<WriteChunk>>,
    ) -> Result<Response<WriteChunkAck>, Status> {
        let mut stream = request.into_inner();

        let header = match stream.next().await {
            Some(Ok(WriteChunk {
                payload: Some(Payload::Header(h)),
            })) => h,
            _ => return Err(Status::invalid_argument("write stream must start with a header")),
        };

        let mut data = Vec::new();
        while let Some(msg) = stream.next().await {
            match msg?.payload {
                Some(Payload::Data(bytes)) => data.extend_from_slice(&bytes),
                Some(Payload::Header(_)) => {
                    return Err(Status::invalid_argument("unexpected second header"))
                }
                None => {}
            }
        }

        let path = chunk_path(
            &self.data_path,
            &header.file_name,
            header.chunk_number,
            &header.extension,
        );
        let lock = self.locks.lock_for(&path);
        let _guard = lock.lock().await;

        let write_result: std::io::Result<()> = async {
            let mut file = File::create(&path).await?;
            file.write_all(&data).await?;
            Ok(())
        }
        .await;

        if let Err(e) = write_result {
            error!("failed to write chunk to {:?}: {}", path, e);
            return Err(Status::internal(format!("local write failed: {}", e)));
        }

        info!("wrote chunk {:?} ({} bytes)", path, data.len());
        let written_len = data.len();

        self.forward_to_peers(&header, data).await;

        let mut ns = self.ns_client().await?;
        ns.chunk_written(Request::new(ChunkWrittenArgs {
            file_name: header.file_name.clone(),
            file_size: header.file_size,
            chunk_size: header.chunk_size,
            replication_factor: header.replication_factor,
            chunk_number: header.chunk_number,
            server: self.self_addr.clone(),
        }))
        .await?;

        Ok(Response::new(WriteChunkAck {
            ok: true,
            message: format!("wrote {} bytes", written_len),
        }))
    }

    type ReadStream = ReadStream;

    async fn read(
        &self,
        request: Request<ReadChunkArgs>,
    ) -> Result<Response<Self::ReadStream>, Status> {
        let args = request.into_inner();
        let path = chunk_path(&self.data_path, &args.file_name, args.chunk_number, &args.extension);

        let lock = self.locks.lock_for(&path);
        let _guard = lock.lock().await;

        let mut file = File::open(&path)
            .await
            .map_err(|e| Status::not_found(format!("chunk {:?} missing: {}", path, e)))?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .await
            .map_err(|e| Status::internal(format!("failed to read {:?}: {}", path, e)))?;

        let stream = tokio_stream::once(Ok(ReadChunkFrame { data: buf }));
        Ok(Response::new(Box::pin(stream)))
    }

    async fn delete(
        &self,
        request: Request<DeleteChunkArgs>,
    ) -> Result<Response<DeleteChunkAck>, Status> {
        let args = request.into_inner();
        let path = chunk_path(&self.data_path, &args.file_name, args.chunk_number, &args.extension);

        let lock = self.locks.lock_for(&path);
        let _guard = lock.lock().await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("delete of {:?} failed: {}", path, e);
        }

        let mut ns = self.ns_client().await?;
        ns.chunk_deleted(Request::new(ChunkDeletedArgs {
            file_name: args.file_name.clone(),
            chunk_number: args.chunk_number,
            server: self.self_addr.clone(),
        }))
        .await?;

        Ok(Response::new(DeleteChunkAck {
            ok: true,
            message: format!("deleted chunk {} of {}", args.chunk_number, args.file_name),
        }))
    }
}

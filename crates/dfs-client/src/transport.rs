//! Thin wrappers around the chunk transport gRPC client, used by both the
//! HDFS client and the Job Client (for pulling map-output chunks).

use dfs_proto::chunk_transport::data_node_client::DataNodeClient;
use dfs_proto::chunk_transport::write_chunk::Payload;
use dfs_proto::chunk_transport::{
    DeleteChunkArgs, ReadChunkArgs, WriteChunk, WriteHeader,
};
use dfs_common::DfsError;
use tokio_stream::StreamExt;
use tonic::Request;

/// Everything needed to place one chunk on a Data Node, beyond the data
/// itself: destination host and the header fields the node will persist
/// and forward to replica peers.
pub struct ChunkPlacement {
    pub host: String,
    pub file_name: String,
    pub extension: String,
    pub chunk_number: u64,
    pub replication_factor: u32,
    pub peers: Vec<String>,
    pub file_size: u64,
    pub chunk_size: u64,
}

pub async fn write_chunk(placement: ChunkPlacement, data: Vec<u8>) -> Result<(), DfsError> {
    let mut client = DataNodeClient::connect(format!("http://{}", placement.host)).await?;
    let frames = vec![
        WriteChunk {
            payload: Some(Payload::Header(WriteHeader {
                file_name: placement.file_name,
                extension: placement.extension,
                chunk_number: placement.chunk_number,
                replication_factor: placement.replication_factor,
                peers: placement.peers,
                file_size: placement.file_size,
                chunk_size: placement.chunk_size,
            })),
        },
        WriteChunk {
            payload: Some(Payload::Data(data)),
        },
    ];
    client
        .write(Request::new(tokio_stream::iter(frames)))
        .await?;
    Ok(())
}

/// Returns `Ok(None)` when the Data Node reports the chunk missing, rather
/// than an error.
pub async fn read_chunk(
    host: &str,
    file_name: &str,
    extension: &str,
    chunk_number: u64,
) -> Result<Option<Vec<u8>>, DfsError> {
    let mut client = DataNodeClient::connect(format!("http://{}", host)).await?;
    let response = client
        .read(Request::new(ReadChunkArgs {
            file_name: file_name.to_string(),
            extension: extension.to_string(),
            chunk_number,
        }))
        .await;

    let mut stream = match response {
        Ok(r) => r.into_inner(),
        Err(status) if status.code() == tonic::Code::NotFound => return Ok(None),
        Err(status) => return Err(status.into()),
    };

    let mut data = Vec::new();
    while let Some(frame) = stream.next().await {
        data.extend_from_slice(&frame?.data);
    }
    Ok(Some(data))
}

pub async fn delete_chunk(
    host: &str,
    file_name: &str,
    extension: &str,
    chunk_number: u64,
) -> Result<(), DfsError> {
    let mut client = DataNodeClient::connect(format!("http://{}", host)).await?;
    client
        .delete(Request::new(DeleteChunkArgs {
            file_name: file_name.to_string(),
            extension: extension.to_string(),
            chunk_number,
        }))
        .await?;
    Ok(())
}

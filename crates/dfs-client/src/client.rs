use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tonic::Request;
use tracing::warn;

use dfs_common::record::RecordFormat;
use dfs_common::DfsError;
use dfs_proto::name_service::name_service_client::NameServiceClient;
use dfs_proto::name_service::{
    AllChunksWrittenArgs, DeleteFileRequestArgs, ReadFileRequestArgs, WriteChunkRequestArgs,
};

use crate::naming::split_name;
use crate::transport::{delete_chunk, read_chunk, write_chunk, ChunkPlacement};

/// Stateless library used by end users or the Job Client to split, place,
/// and reassemble chunked files.
pub struct HdfsClient {
    pub name_service_addr: String,
    pub chunk_size: u64,
    pub replication_factor: u32,
}

impl HdfsClient {
    async fn ns(&self) -> Result<NameServiceClient<tonic::transport::Channel>, DfsError> {
        Ok(NameServiceClient::connect(format!("http://{}", self.name_service_addr)).await?)
    }

    /// Splits `local_path` into record-aligned chunks and writes them to the
    /// Data Nodes the Name Service assigns, then finalizes the file.
    pub async fn write(
        &self,
        format: RecordFormat,
        local_path: &Path,
        hdfs_name: &str,
    ) -> Result<(), DfsError> {
        let (file_name, extension) = split_name(hdfs_name);
        let mut reader = format.open_reader(local_path)?;
        let mut ns = self.ns().await?;

        let mut pending = reader.read_record()?;
        if pending.is_none() {
            ns.all_chunks_written(Request::new(AllChunksWrittenArgs {
                file_name: file_name.to_string(),
            }))
            .await?;
            return Ok(());
        }

        let mut chunk_index: u64 = 0;
        while let Some(first) = pending.take() {
            if first.len() as u64 > self.chunk_size {
                return Err(DfsError::RecordTooLarge {
                    size: first.len() as u64,
                    chunk_size: self.chunk_size,
                });
            }

            let start_index = reader.index() - first.len() as u64;
            let tmp_path = temp_chunk_path(file_name, chunk_index);
            {
                let mut tmp = File::create(&tmp_path)?;
                tmp.write_all(&first)?;

                loop {
                    match reader.read_record()? {
                        Some(rec) if reader.index() - start_index <= self.chunk_size => {
                            tmp.write_all(&rec)?;
                        }
                        Some(rec) => {
                            pending = Some(rec);
                            break;
                        }
                        None => {
                            pending = None;
                            break;
                        }
                    }
                }
                tmp.flush()?;
            }

            let data = std::fs::read(&tmp_path)?;
            let hosts = ns
                .write_chunk_request(Request::new(WriteChunkRequestArgs {
                    replication_factor: self.replication_factor,
                }))
                .await?
                .into_inner()
                .hosts;
            if hosts.is_empty() {
                std::fs::remove_file(&tmp_path).ok();
                return Err(DfsError::NoDataNodes);
            }

            write_chunk(
                ChunkPlacement {
                    host: hosts[0].clone(),
                    file_name: file_name.to_string(),
                    extension: extension.to_string(),
                    chunk_number: chunk_index,
                    replication_factor: hosts.len() as u32,
                    peers: hosts[1..].to_vec(),
                    file_size: 0,
                    chunk_size: self.chunk_size,
                },
                data,
            )
            .await?;

            std::fs::remove_file(&tmp_path).ok();
            chunk_index += 1;
        }

        ns.all_chunks_written(Request::new(AllChunksWrittenArgs {
            file_name: file_name.to_string(),
        }))
        .await?;
        Ok(())
    }

    /// Reassembles `hdfs_name` into `local_dest_path`; aborts with
    /// `MissingChunks` on any gap, leaving the destination untouched.
    pub async fn read(&self, hdfs_name: &str, local_dest_path: &Path) -> Result<(), DfsError> {
        let (file_name, extension) = split_name(hdfs_name);
        let mut ns = self.ns().await?;
        let hosts = match ns
            .read_file_request(Request::new(ReadFileRequestArgs {
                file_name: file_name.to_string(),
            }))
            .await
        {
            Ok(r) => r.into_inner().hosts,
            // A dead replica host still listed for some chunk surfaces the
            // same way a DN-side read-miss does: no partial destination.
            Err(status) if matches!(DfsError::from(status.clone()), DfsError::NoLiveReplica { .. }) => {
                return Err(DfsError::MissingChunks(hdfs_name.to_string()))
            }
            Err(status) => return Err(status.into()),
        };

        let mut received = HashSet::new();
        let mut tmp_paths = Vec::with_capacity(hosts.len());
        for (index, host) in hosts.iter().enumerate() {
            let chunk_number = index as u64;
            let tmp_path = temp_chunk_path(file_name, chunk_number);
            match read_chunk(host, file_name, extension, chunk_number).await {
                Ok(Some(data)) => {
                    std::fs::write(&tmp_path, &data)?;
                    tmp_paths.push(tmp_path);
                    received.insert(chunk_number);
                }
                Ok(None) => warn!("chunk {} of {} missing on {}", chunk_number, hdfs_name, host),
                Err(e) => warn!("read of chunk {} of {} failed: {}", chunk_number, hdfs_name, e),
            }
        }

        let expected: HashSet<u64> = (0..hosts.len() as u64).collect();
        if received != expected {
            for path in &tmp_paths {
                std::fs::remove_file(path).ok();
            }
            return Err(DfsError::MissingChunks(hdfs_name.to_string()));
        }

        let mut out = File::create(local_dest_path)?;
        for chunk_number in 0..hosts.len() as u64 {
            let path = temp_chunk_path(file_name, chunk_number);
            let data = std::fs::read(&path)?;
            out.write_all(&data)?;
        }
        out.flush()?;

        for path in &tmp_paths {
            std::fs::remove_file(path).ok();
        }
        Ok(())
    }

    /// Deletes `hdfs_name`'s metadata and issues DELETE to every replica
    /// host; per-DN confirmation is not awaited.
    pub async fn delete(&self, hdfs_name: &str) -> Result<(), DfsError> {
        let (file_name, extension) = split_name(hdfs_name);
        let mut ns = self.ns().await?;
        let reply = ns
            .delete_file_request(Request::new(DeleteFileRequestArgs {
                file_name: file_name.to_string(),
            }))
            .await?
            .into_inner();

        for assignment in reply.assignments {
            if let Err(e) =
                delete_chunk(&assignment.host, file_name, extension, assignment.chunk_number).await
            {
                warn!(
                    "delete of chunk {} on {} failed: {}",
                    assignment.chunk_number, assignment.host, e
                );
            }
        }
        Ok(())
    }
}

fn temp_chunk_path(file_name: &str, chunk_index: u64) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}.tmp", file_name, chunk_index))
}

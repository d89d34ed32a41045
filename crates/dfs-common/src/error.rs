use thiserror::Error;
use tonic::Status;

/// Stable error taxonomy shared by the Name Service, the HDFS client, and the
/// job dispatch layer.
#[derive(Debug, Error)]
pub enum DfsError {
    #[error("no live data nodes available")]
    NoDataNodes,

    #[error("no live daemons available")]
    NoDaemons,

    #[error("unknown file: {0}")]
    UnknownFile(String),

    #[error("file is not complete: {0}")]
    Incomplete(String),

    #[error("no live replica for chunk {chunk} of {file}")]
    NoLiveReplica { file: String, chunk: u64 },

    #[error("record of {size} bytes exceeds chunk size {chunk_size}")]
    RecordTooLarge { size: u64, chunk_size: u64 },

    #[error("read returned a non-contiguous set of chunks for {0}")]
    MissingChunks(String),

    #[error("no live daemon co-located with chunk host {0}")]
    LocalityUnsatisfied(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("snapshot at {0} is corrupt")]
    SnapshotCorrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<tonic::transport::Error> for DfsError {
    fn from(e: tonic::transport::Error) -> Self {
        DfsError::TransportError(e.to_string())
    }
}

impl From<Status> for DfsError {
    fn from(s: Status) -> Self {
        let msg = s.message().to_string();
        if msg == "no live data nodes available" {
            return DfsError::NoDataNodes;
        }
        if msg == "no live daemons available" {
            return DfsError::NoDaemons;
        }
        if let Some(rest) = msg.strip_prefix("unknown file: ") {
            return DfsError::UnknownFile(rest.to_string());
        }
        if let Some(rest) = msg.strip_prefix("file is not complete: ") {
            return DfsError::Incomplete(rest.to_string());
        }
        if let Some(rest) =
            msg.strip_prefix("read returned a non-contiguous set of chunks for ")
        {
            return DfsError::MissingChunks(rest.to_string());
        }
        if let Some(rest) = msg.strip_prefix("no live daemon co-located with chunk host ") {
            return DfsError::LocalityUnsatisfied(rest.to_string());
        }
        if let Some(rest) = msg.strip_prefix("no live replica for chunk ") {
            if let Some((chunk, file)) = rest.split_once(" of ") {
                if let Ok(chunk) = chunk.parse() {
                    return DfsError::NoLiveReplica {
                        file: file.to_string(),
                        chunk,
                    };
                }
            }
        }
        DfsError::TransportError(msg)
    }
}

impl From<DfsError> for Status {
    fn from(e: DfsError) -> Self {
        match e {
            DfsError::NoDataNodes => Status::unavailable(e.to_string()),
            DfsError::NoDaemons => Status::unavailable(e.to_string()),
            DfsError::UnknownFile(_) => Status::not_found(e.to_string()),
            DfsError::Incomplete(_) => Status::failed_precondition(e.to_string()),
            DfsError::NoLiveReplica { .. } => Status::unavailable(e.to_string()),
            DfsError::RecordTooLarge { .. } => Status::invalid_argument(e.to_string()),
            DfsError::MissingChunks(_) => Status::data_loss(e.to_string()),
            DfsError::LocalityUnsatisfied(_) => Status::failed_precondition(e.to_string()),
            DfsError::TransportError(_) => Status::unavailable(e.to_string()),
            DfsError::SnapshotCorrupt(_) => Status::internal(e.to_string()),
            DfsError::Io(_) => Status::internal(e.to_string()),
        }
    }
}

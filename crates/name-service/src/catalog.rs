//! The authoritative catalog of files -> chunk placements, and the liveness
//! registries for Data Nodes and Daemons. This is the core of the Name
//! Service.

use dfs_common::DfsError;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{info, warn};

/// NS's per-file metadata record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileData {
    pub file_size: u64,
    pub chunk_size: u64,
    pub replication_factor: u32,
    pub chunk_handles: HashMap<u64, HashSet<String>>,
    pub complete: bool,
}

impl FileData {
    fn new(file_size: u64, chunk_size: u64, replication_factor: u32) -> Self {
        Self {
            file_size,
            chunk_size,
            replication_factor,
            chunk_handles: HashMap::new(),
            complete: false,
        }
    }
}

#[derive(Default)]
struct LiveNodes {
    data_nodes: HashSet<String>,
    daemons: HashSet<String>,
}

/// The Name Service's in-memory state plus durable snapshot machinery.
pub struct Catalog {
    files: RwLock<HashMap<String, FileData>>,
    live: RwLock<LiveNodes>,
    snapshot_path: PathBuf,
    snapshot_lock: Mutex<()>,
    snapshot_requested: Notify,
}

impl Catalog {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            live: RwLock::new(LiveNodes::default()),
            snapshot_path: snapshot_path.into(),
            snapshot_lock: Mutex::new(()),
            snapshot_requested: Notify::new(),
        }
    }

    /// Loads the snapshot at startup. A corrupt snapshot is discarded with a
    /// warning; NS starts empty rather than refusing to come up.
    pub async fn load_snapshot(self: &Arc<Self>) {
        let path = &self.snapshot_path;
        if !path.exists() {
            info!("no snapshot found at {:?}, starting empty", path);
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, FileData>>(&content) {
                Ok(loaded) => {
                    let mut files = self.files.write().await;
                    *files = loaded;
                    info!("loaded snapshot from {:?} ({} files)", path, files.len());
                }
                Err(e) => {
                    warn!("snapshot at {:?} is corrupt ({}), starting empty", path, e);
                }
            },
            Err(e) => {
                warn!("failed to read snapshot at {:?} ({}), starting empty", path, e);
            }
        }
    }

    /// Spawns the background snapshot task. Duplicate requests that arrive
    /// while a snapshot is in flight collapse into at most one follow-up
    /// snapshot.
    pub fn spawn_snapshot_task(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                this.snapshot_requested.notified().await;
                this.run_snapshot().await;
            }
        });
    }

    fn request_snapshot(self: &Arc<Self>) {
        self.snapshot_requested.notify_one();
    }

    async fn run_snapshot(&self) {
        let _guard = self.snapshot_lock.lock().await;
        let files = self.files.read().await.clone();
        let tmp_path = self.snapshot_path.with_extension("tmp");
        let result = serde_json::to_string(&files)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&tmp_path, json))
            .and_then(|_| std::fs::rename(&tmp_path, &self.snapshot_path));
        match result {
            Ok(()) => info!("wrote snapshot to {:?}", self.snapshot_path),
            Err(e) => warn!("failed to write snapshot to {:?}: {}", self.snapshot_path, e),
        }
    }

    // -- liveness registries --

    pub async fn notify_data_node_availability(&self, addr: String) {
        self.live.write().await.data_nodes.insert(addr);
    }

    pub async fn notify_daemon_availability(&self, addr: String) {
        self.live.write().await.daemons.insert(addr);
    }

    pub async fn live_data_nodes(&self) -> HashSet<String> {
        self.live.read().await.data_nodes.clone()
    }

    pub async fn available_daemons(&self) -> Result<HashSet<String>, DfsError> {
        let daemons = self.live.read().await.daemons.clone();
        if daemons.is_empty() {
            Err(DfsError::NoDaemons)
        } else {
            Ok(daemons)
        }
    }

    // -- placement --

    /// Returns `min(r, |liveDataNodes|)` addresses chosen uniformly at
    /// random without replacement.
    pub async fn write_chunk_request(&self, r: u32) -> Result<Vec<String>, DfsError> {
        let live = self.live_data_nodes().await;
        if live.is_empty() {
            return Err(DfsError::NoDataNodes);
        }
        let mut candidates: Vec<String> = live.into_iter().collect();
        let count = (r as usize).min(candidates.len());
        if count < r as usize {
            warn!(
                "replication factor {} requested but only {} live data nodes",
                r, candidates.len()
            );
        }
        let mut rng = rand::thread_rng();
        candidates.shuffle(&mut rng);
        candidates.truncate(count);
        Ok(candidates)
    }

    pub async fn read_file_request(&self, file_name: &str) -> Result<Vec<String>, DfsError> {
        let files = self.files.read().await;
        let file = files
            .get(file_name)
            .ok_or_else(|| DfsError::UnknownFile(file_name.to_string()))?;
        if !file.complete {
            return Err(DfsError::Incomplete(file_name.to_string()));
        }
        let live = self.live_data_nodes().await;
        let mut hosts = Vec::with_capacity(file.file_size as usize);
        for chunk in 0..file.file_size {
            let replicas = file.chunk_handles.get(&chunk);
            let chosen = replicas
                .into_iter()
                .flatten()
                .find(|host| live.contains(*host))
                .cloned();
            match chosen {
                Some(host) => hosts.push(host),
                None => {
                    return Err(DfsError::NoLiveReplica {
                        file: file_name.to_string(),
                        chunk,
                    })
                }
            }
        }
        Ok(hosts)
    }

    /// Returns every (chunk_number, host) replica pair for the file, plus
    /// the distinct set of hosts those pairs touch.
    pub async fn delete_file_request(
        &self,
        file_name: &str,
    ) -> Result<(Vec<String>, Vec<(u64, String)>), DfsError> {
        let files = self.files.read().await;
        let file = files
            .get(file_name)
            .ok_or_else(|| DfsError::UnknownFile(file_name.to_string()))?;

        let mut assignments: Vec<(u64, String)> = Vec::new();
        for (&chunk_number, hosts) in &file.chunk_handles {
            for host in hosts {
                assignments.push((chunk_number, host.clone()));
            }
        }
        assignments.sort();

        let mut hosts: Vec<String> = assignments
            .iter()
            .map(|(_, h)| h.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        hosts.sort();
        Ok((hosts, assignments))
    }

    // -- mutation callbacks --

    pub async fn chunk_written(
        self: &Arc<Self>,
        file_name: &str,
        file_size: u64,
        chunk_size: u64,
        replication_factor: u32,
        chunk_number: u64,
        server: &str,
    ) {
        {
            let mut files = self.files.write().await;
            let entry = files.entry(file_name.to_string()).or_insert_with(|| {
                FileData::new(file_size, chunk_size, replication_factor)
            });

            if entry.chunk_size != chunk_size {
                if entry.file_size != file_size || entry.replication_factor != replication_factor
                {
                    // A rewrite: fileSize/replicationFactor changed alongside
                    // chunkSize, so this is a fresh generation of the file.
                    entry.chunk_handles.clear();
                    entry.file_size = file_size;
                    entry.replication_factor = replication_factor;
                    entry.complete = false;
                }
                // Either way, chunkSize moves to the new value (a map-output
                // write reports only chunkSize changing, preserving handles).
                entry.chunk_size = chunk_size;
            }

            entry
                .chunk_handles
                .entry(chunk_number)
                .or_default()
                .insert(server.to_string());
        }
        self.request_snapshot();
    }

    pub async fn all_chunks_written(self: &Arc<Self>, file_name: &str) {
        {
            let mut files = self.files.write().await;
            match files.get_mut(file_name) {
                Some(file) => {
                    file.file_size = file.chunk_handles.len() as u64;
                    file.complete = true;
                }
                None => {
                    let mut file = FileData::new(0, 0, 1);
                    file.complete = true;
                    files.insert(file_name.to_string(), file);
                }
            }
        }
        self.request_snapshot();
    }

    pub async fn chunk_deleted(self: &Arc<Self>, file_name: &str, chunk_number: u64, server: &str) {
        {
            let mut files = self.files.write().await;
            if let Some(file) = files.get_mut(file_name) {
                if let Some(handles) = file.chunk_handles.get_mut(&chunk_number) {
                    handles.remove(server);
                    if handles.is_empty() {
                        file.chunk_handles.remove(&chunk_number);
                    }
                }
                if file.chunk_handles.is_empty() {
                    files.remove(file_name);
                }
            }
        }
        self.request_snapshot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn catalog_with_two_nodes() -> Arc<Catalog> {
        let dir = tempfile::tempdir().unwrap();
        let cat = Arc::new(Catalog::new(dir.path().join("snapshot.json")));
        cat.notify_data_node_availability("node-a".into()).await;
        cat.notify_data_node_availability("node-b".into()).await;
        cat
    }

    #[tokio::test]
    async fn write_chunk_request_is_bounded_and_distinct() {
        let cat = catalog_with_two_nodes().await;
        let hosts = cat.write_chunk_request(5).await.unwrap();
        assert_eq!(hosts.len(), 2);
        let unique: HashSet<_> = hosts.iter().collect();
        assert_eq!(unique.len(), hosts.len());
    }

    #[tokio::test]
    async fn write_chunk_request_fails_with_no_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let cat = Catalog::new(dir.path().join("s.json"));
        assert!(matches!(
            cat.write_chunk_request(2).await,
            Err(DfsError::NoDataNodes)
        ));
    }

    #[tokio::test]
    async fn chunk_written_then_all_chunks_written_completes_file() {
        let cat = catalog_with_two_nodes().await;
        cat.chunk_written("f", 0, 16, 1, 0, "node-a").await;
        cat.chunk_written("f", 0, 16, 1, 1, "node-a").await;
        cat.all_chunks_written("f").await;

        let hosts = cat.read_file_request("f").await.unwrap();
        assert_eq!(hosts, vec!["node-a", "node-a"]);
    }

    #[tokio::test]
    async fn read_unknown_file_fails() {
        let cat = catalog_with_two_nodes().await;
        assert!(matches!(
            cat.read_file_request("missing").await,
            Err(DfsError::UnknownFile(_))
        ));
    }

    #[tokio::test]
    async fn read_incomplete_file_fails() {
        let cat = catalog_with_two_nodes().await;
        cat.chunk_written("f", 2, 16, 1, 0, "node-a").await;
        assert!(matches!(
            cat.read_file_request("f").await,
            Err(DfsError::Incomplete(_))
        ));
    }

    #[tokio::test]
    async fn all_chunks_written_on_empty_file_creates_zero_chunk_entry() {
        let cat = catalog_with_two_nodes().await;
        cat.all_chunks_written("empty").await;
        let hosts = cat.read_file_request("empty").await.unwrap();
        assert!(hosts.is_empty());
    }

    #[tokio::test]
    async fn chunk_written_map_output_rewrite_preserves_handles_on_chunk_size_only_change() {
        let cat = catalog_with_two_nodes().await;
        cat.chunk_written("f", 1, 16, 1, 0, "node-a").await;
        cat.chunk_written("f", 1, 32, 1, 0, "node-a").await; // chunk_size only differs
        let files = cat.files.read().await;
        let f = files.get("f").unwrap();
        assert_eq!(f.chunk_size, 32);
        assert_eq!(f.chunk_handles.len(), 1);
    }

    #[tokio::test]
    async fn chunk_written_full_rewrite_clears_handles() {
        let cat = catalog_with_two_nodes().await;
        cat.chunk_written("f", 1, 16, 1, 0, "node-a").await;
        cat.chunk_written("f", 5, 32, 2, 0, "node-b").await; // file_size and replication differ too
        let files = cat.files.read().await;
        let f = files.get("f").unwrap();
        assert_eq!(f.file_size, 5);
        assert_eq!(f.replication_factor, 2);
        assert_eq!(f.chunk_handles.len(), 1);
        assert!(f.chunk_handles[&0].contains("node-b"));
        assert!(!f.chunk_handles[&0].contains("node-a"));
    }

    #[tokio::test]
    async fn chunk_deleted_removes_file_when_last_handle_gone() {
        let cat = catalog_with_two_nodes().await;
        cat.chunk_written("f", 1, 16, 1, 0, "node-a").await;
        cat.all_chunks_written("f").await;
        cat.chunk_deleted("f", 0, "node-a").await;
        assert!(matches!(
            cat.read_file_request("f").await,
            Err(DfsError::UnknownFile(_))
        ));
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let cat = Arc::new(Catalog::new(path.clone()));
        cat.notify_data_node_availability("node-a".into()).await;
        cat.chunk_written("f", 1, 16, 1, 0, "node-a").await;
        cat.all_chunks_written("f").await;
        cat.run_snapshot().await;

        let reloaded = Arc::new(Catalog::new(path));
        reloaded.load_snapshot().await;
        reloaded.notify_data_node_availability("node-a".into()).await;
        let hosts = reloaded.read_file_request("f").await.unwrap();
        assert_eq!(hosts, vec!["node-a"]);
    }

    #[tokio::test]
    async fn available_daemons_fails_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cat = Catalog::new(dir.path().join("s.json"));
        assert!(matches!(cat.available_daemons().await, Err(DfsError::NoDaemons)));
    }
}

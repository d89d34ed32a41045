//! Local chunk storage. Operations on distinct paths are lock-free;
//! operations on the same path are serialized via a path-keyed mutex.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct PathLocks {
    locks: StdMutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Deterministic on-disk path for a chunk: `{data_path}/{fileName}-{chunkNumber}{extension}`.
pub fn chunk_path(data_path: &Path, file_name: &str, chunk_number: u64, extension: &str) -> PathBuf {
    data_path.join(format!("{}-{}{}", file_name, chunk_number, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_path_is_deterministic() {
        let p = chunk_path(Path::new("/data"), "words", 3, ".line");
        assert_eq!(p, PathBuf::from("/data/words-3.line"));
    }
}

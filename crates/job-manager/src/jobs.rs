//! Per-job state owned by the Job Manager. The Job Manager does not drive
//! maps itself; the Job Client does. JM only tracks what has been
//! dispatched and what has reported back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct JobState {
    pub job_kind: String,
    pub input_format: String,
    pub input_file_name: Option<String>,
    pub started: bool,
    pub expected_maps: u64,
    pub completed_maps: u64,
}

impl JobState {
    fn new(job_kind: String, input_format: String, input_file_name: Option<String>) -> Self {
        Self {
            job_kind,
            input_format,
            input_file_name,
            started: false,
            expected_maps: 0,
            completed_maps: 0,
        }
    }
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<u64, Arc<Mutex<JobState>>>>,
    next_id: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_job(
        &self,
        job_kind: String,
        input_format: String,
        input_file_name: Option<String>,
    ) -> u64 {
        let job_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let state = JobState::new(job_kind, input_format, input_file_name);
        self.jobs
            .write()
            .await
            .insert(job_id, Arc::new(Mutex::new(state)));
        job_id
    }

    async fn job(&self, job_id: u64) -> Option<Arc<Mutex<JobState>>> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    pub async fn start_job(&self, job_id: u64) -> bool {
        match self.job(job_id).await {
            Some(job) => {
                job.lock().await.started = true;
                true
            }
            None => false,
        }
    }

    pub async fn submit_map(&self, job_id: u64) -> bool {
        match self.job(job_id).await {
            Some(job) => {
                job.lock().await.expected_maps += 1;
                true
            }
            None => false,
        }
    }

    /// `completedMaps` is monotonic: increment, never overwrite.
    pub async fn map_completed(&self, job_id: u64) -> bool {
        match self.job(job_id).await {
            Some(job) => {
                job.lock().await.completed_maps += 1;
                true
            }
            None => false,
        }
    }

    pub async fn completed_maps(&self, job_id: u64) -> Option<u64> {
        let job = self.job(job_id).await?;
        let completed = job.lock().await.completed_maps;
        Some(completed)
    }

    pub async fn remove(&self, job_id: u64) {
        self.jobs.write().await.remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn job_ids_are_monotonic() {
        let reg = JobRegistry::new();
        let a = reg.add_job("word_count".into(), "line".into(), None).await;
        let b = reg.add_job("word_count".into(), "line".into(), None).await;
        assert!(b > a);
    }

    #[tokio::test]
    async fn completed_maps_accumulates() {
        let reg = JobRegistry::new();
        let id = reg.add_job("word_count".into(), "line".into(), None).await;
        reg.submit_map(id).await;
        reg.submit_map(id).await;
        reg.map_completed(id).await;
        reg.map_completed(id).await;
        assert_eq!(reg.completed_maps(id).await, Some(2));
    }
}

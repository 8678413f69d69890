//! In-memory job records and durable per-job checkpoints.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use coach_models::{Job, JobCheckpoint, JobId, JobStatus};

/// In-memory record per job, with registration order preserved so the
/// scheduler's queued-job scan is first-in-first-out.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: HashMap<String, Job>,
    order: Vec<String>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new queued job and return a snapshot of it. Ids are
    /// externally assigned and unique; re-registering an id replaces
    /// the record but keeps its original queue position.
    pub fn create(&mut self, id: JobId) -> Job {
        let key = id.as_str().to_string();
        if !self.jobs.contains_key(&key) {
            self.order.push(key.clone());
        }
        let job = Job::new(id);
        self.jobs.insert(key, job.clone());
        job
    }

    /// Look up a job.
    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Look up a job for mutation.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    /// First job still queued, in registration order.
    pub fn next_queued(&self) -> Option<JobId> {
        self.order
            .iter()
            .filter_map(|key| self.jobs.get(key))
            .find(|job| job.status == JobStatus::Queued)
            .map(|job| job.id.clone())
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Iterate jobs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|key| self.jobs.get(key))
    }
}

/// Durable checkpoint writer/reader.
///
/// One document per job at `<dir>/<job_id>/job.json`, rewritten after
/// every mutation. Writes are fire-and-forget with respect to pipeline
/// progress: failures are logged and swallowed, the in-memory record
/// stays authoritative for the current process lifetime.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a checkpoint store rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Persist a snapshot of the job. Never fails the caller.
    pub async fn write(&self, job: &Job) {
        if let Err(err) = self.try_write(job).await {
            warn!(job_id = %job.id, error = %err, "checkpoint write failed");
        }
    }

    async fn try_write(&self, job: &Job) -> io::Result<()> {
        let job_dir = self.dir.join(job.id.as_str());
        tokio::fs::create_dir_all(&job_dir).await?;

        let doc = JobCheckpoint::from(job);
        let bytes = serde_json::to_vec_pretty(&doc).map_err(io::Error::other)?;
        tokio::fs::write(job_dir.join("job.json"), bytes).await
    }

    /// Load the checkpointed snapshot for a job, if one exists and
    /// parses. Used by status readers when the in-memory record is gone
    /// (e.g. after a restart).
    pub async fn load(&self, id: &str) -> Option<JobCheckpoint> {
        let path = self.dir.join(id).join("job.json");
        let bytes = tokio::fs::read(&path).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

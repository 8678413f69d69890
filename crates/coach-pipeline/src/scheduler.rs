//! Single-worker job scheduler.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use coach_ai::AnalysisProvider;
use coach_media::MediaSampler;
use coach_models::{Job, JobId, JobStatus, Observation, StatusReport};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::store::{CheckpointStore, JobStore};

/// The only shared mutable state: the job map and the busy flag,
/// guarded together so a dispatch decision and the claim it implies are
/// atomic.
struct DispatchState {
    store: JobStore,
    busy: bool,
}

struct Inner {
    state: Mutex<DispatchState>,
    sampler: Arc<dyn MediaSampler>,
    provider: Arc<dyn AnalysisProvider>,
    checkpoints: CheckpointStore,
    config: PipelineConfig,
}

/// Drives one job at a time through its state machine, checkpointing
/// after every mutation.
///
/// Constructed once at process start and handed to the submission and
/// status boundaries. Cloning shares the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Create a scheduler.
    pub fn new(
        config: PipelineConfig,
        sampler: Arc<dyn MediaSampler>,
        provider: Arc<dyn AnalysisProvider>,
    ) -> Self {
        let checkpoints = CheckpointStore::new(&config.uploads_dir);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(DispatchState {
                    store: JobStore::new(),
                    busy: false,
                }),
                sampler,
                provider,
                checkpoints,
                config,
            }),
        }
    }

    /// Register a new job and kick the dispatcher.
    ///
    /// The submission boundary guarantees the source video is already in
    /// place under the job's upload directory.
    pub async fn submit(&self, id: JobId) {
        info!(job_id = %id, "job submitted");
        let snapshot = {
            let mut state = self.inner.state.lock().await;
            state.store.create(id)
        };
        self.inner.checkpoints.write(&snapshot).await;
        self.dispatch();
    }

    /// Start the worker loop unless one is already running.
    ///
    /// While a job is active this is a no-op; the active worker claims
    /// the next queued job itself when it finishes.
    pub fn dispatch(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                let claimed = {
                    let mut state = inner.state.lock().await;
                    if state.busy {
                        return;
                    }
                    match state.store.next_queued() {
                        Some(id) => {
                            state.busy = true;
                            id
                        }
                        None => return,
                    }
                };

                inner.run_job(&claimed).await;

                let mut state = inner.state.lock().await;
                state.busy = false;
            }
        });
    }

    /// Report a job's state for the status boundary.
    ///
    /// Prefers the live record; falls back to the persisted checkpoint
    /// so readers still get an answer after a restart.
    pub async fn status(&self, id: &str) -> Option<StatusReport> {
        {
            let state = self.inner.state.lock().await;
            if let Some(job) = state.store.get(id) {
                return Some(StatusReport::from(job));
            }
        }
        self.inner.checkpoints.load(id).await.map(StatusReport::from)
    }

    /// Snapshot a live job record.
    pub async fn job(&self, id: &str) -> Option<Job> {
        let state = self.inner.state.lock().await;
        state.store.get(id).cloned()
    }
}

impl Inner {
    async fn run_job(&self, id: &JobId) {
        info!(job_id = %id, "job claimed");
        match self.execute(id).await {
            Ok(()) => info!(job_id = %id, "job completed"),
            Err(err) => {
                error!(job_id = %id, error = %err, "job failed");
                let message = err.to_string();
                self.update(id, move |job| job.fail(message)).await;
            }
        }
    }

    /// Run the pipeline for one job, checkpointing after each stage.
    async fn execute(&self, id: &JobId) -> PipelineResult<()> {
        self.update(id, |job| job.set_status(JobStatus::Processing))
            .await;

        let metadata = self.sampler.probe(id.as_str()).await?;
        let probed = metadata.clone();
        self.update(id, move |job| {
            job.metadata = Some(probed);
            job.set_progress(20);
        })
        .await;

        let frames = self.sampler.extract_frames(id.as_str()).await?;
        let frame_refs: Vec<String> = frames.iter().map(|p| p.display().to_string()).collect();
        self.update(id, move |job| {
            job.frames = Some(frame_refs);
            job.set_progress(40);
        })
        .await;

        self.update(id, |job| {
            job.set_status(JobStatus::Analyzing);
            job.set_progress(50);
        })
        .await;

        let mut analysis = self.provider.analyze(&frames, &metadata).await?;
        self.update(id, |job| job.set_progress(70)).await;

        let clips = self.generate_clips(id, &analysis.observations).await;
        self.update(id, |job| job.set_progress(90)).await;

        analysis.sample_clips = clips;
        self.update(id, move |job| job.complete(analysis)).await;
        Ok(())
    }

    /// Generate sample clips for high-confidence observations.
    ///
    /// Clip failures are logged and skipped; the observation is retained
    /// either way.
    async fn generate_clips(&self, id: &JobId, observations: &[Observation]) -> Vec<String> {
        let requests = observations
            .iter()
            .filter(|obs| obs.confidence > self.config.confidence_threshold)
            .map(|obs| {
                let timestamp = obs.timestamp;
                async move {
                    match self.sampler.generate_clip(id.as_str(), timestamp).await {
                        Ok(path) => Some(path.display().to_string()),
                        Err(err) => {
                            warn!(
                                job_id = %id,
                                timestamp,
                                error = %err,
                                "sample clip generation failed, skipping"
                            );
                            None
                        }
                    }
                }
            });

        futures::future::join_all(requests)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Mutate a job under the lock, then mirror the new snapshot to the
    /// durable checkpoint.
    async fn update(&self, id: &JobId, mutate: impl FnOnce(&mut Job)) {
        let snapshot = {
            let mut state = self.state.lock().await;
            match state.store.get_mut(id.as_str()) {
                Some(job) => {
                    mutate(job);
                    Some(job.clone())
                }
                None => None,
            }
        };
        if let Some(job) = snapshot {
            self.checkpoints.write(&job).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coach_ai::MockProvider;
    use coach_media::{MediaError, MediaResult};
    use coach_models::VideoMetadata;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StubSampler {
        frames: Vec<PathBuf>,
        probe_delay: Duration,
        fail_probe: bool,
        fail_clips: bool,
        probe_log: StdMutex<Vec<String>>,
        clips_generated: AtomicUsize,
    }

    impl StubSampler {
        fn new(frame_count: usize) -> Self {
            Self {
                frames: (0..frame_count)
                    .map(|i| PathBuf::from(format!("frames/frame-{}.jpg", i * 5)))
                    .collect(),
                probe_delay: Duration::ZERO,
                fail_probe: false,
                fail_clips: false,
                probe_log: StdMutex::new(Vec::new()),
                clips_generated: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaSampler for StubSampler {
        async fn probe(&self, job_id: &str) -> MediaResult<VideoMetadata> {
            self.probe_log.lock().unwrap().push(job_id.to_string());
            tokio::time::sleep(self.probe_delay).await;
            if self.fail_probe {
                return Err(MediaError::NoVideoStream(PathBuf::from(job_id)));
            }
            Ok(VideoMetadata {
                duration: 12.0,
                fps: 30.0,
                width: 1920,
                height: 1080,
            })
        }

        async fn extract_frames(&self, _job_id: &str) -> MediaResult<Vec<PathBuf>> {
            Ok(self.frames.clone())
        }

        async fn generate_clip(&self, job_id: &str, start_time: f64) -> MediaResult<PathBuf> {
            if self.fail_clips {
                return Err(MediaError::FfmpegNotFound);
            }
            self.clips_generated.fetch_add(1, Ordering::SeqCst);
            Ok(PathBuf::from(format!(
                "uploads/{}/samples/sample-{}.mp4",
                job_id,
                start_time.round() as i64
            )))
        }
    }

    fn scheduler_with(
        dir: &TempDir,
        sampler: Arc<StubSampler>,
        confidence_threshold: f64,
    ) -> Scheduler {
        Scheduler::new(
            PipelineConfig {
                uploads_dir: dir.path().to_path_buf(),
                confidence_threshold,
            },
            sampler,
            Arc::new(MockProvider::with_delay(Duration::ZERO)),
        )
    }

    async fn wait_terminal(scheduler: &Scheduler, id: &str) -> StatusReport {
        for _ in 0..1000 {
            if let Some(report) = scheduler.status(id).await {
                if report.status.is_terminal() {
                    return report;
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job {id} did not reach a terminal state");
    }

    #[tokio::test]
    async fn test_job_completes_through_pipeline() {
        let dir = TempDir::new().unwrap();
        let sampler = Arc::new(StubSampler::new(3));
        // Threshold 0 so every observation deterministically gets a clip.
        let scheduler = scheduler_with(&dir, Arc::clone(&sampler), 0.0);

        scheduler.submit(JobId::from_string("job-1")).await;
        let report = wait_terminal(&scheduler, "job-1").await;

        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.message, "Analysis complete");
        assert_eq!(report.frames.as_ref().unwrap().len(), 3);

        let result = report.result.unwrap();
        assert_eq!(result.observations.len(), 3);
        assert_eq!(result.overall_suggestions.len(), 4);
        assert_eq!(result.sample_clips.len(), 3);
        assert_eq!(sampler.clips_generated.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_checkpoint_mirrors_final_state() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler_with(&dir, Arc::new(StubSampler::new(2)), 0.0);

        scheduler.submit(JobId::from_string("job-1")).await;
        wait_terminal(&scheduler, "job-1").await;

        let raw = std::fs::read(dir.path().join("job-1").join("job.json")).unwrap();
        let doc: coach_models::JobCheckpoint = serde_json::from_slice(&raw).unwrap();
        assert_eq!(doc.status, JobStatus::Completed);
        assert_eq!(doc.progress, 100);
        assert!(doc.result.is_some());
    }

    #[tokio::test]
    async fn test_status_survives_restart_via_checkpoint() {
        let dir = TempDir::new().unwrap();
        {
            let scheduler = scheduler_with(&dir, Arc::new(StubSampler::new(2)), 0.0);
            scheduler.submit(JobId::from_string("job-1")).await;
            wait_terminal(&scheduler, "job-1").await;
        }

        // A fresh scheduler has no in-memory record, only the checkpoint.
        let restarted = scheduler_with(&dir, Arc::new(StubSampler::new(0)), 0.0);
        let report = restarted.status("job-1").await.unwrap();
        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.progress, 100);
        assert!(report.result.is_some());

        assert!(restarted.status("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_probe_failure_fails_job_at_zero_progress() {
        let dir = TempDir::new().unwrap();
        let mut stub = StubSampler::new(3);
        stub.fail_probe = true;
        let scheduler = scheduler_with(&dir, Arc::new(stub), 0.0);

        scheduler.submit(JobId::from_string("job-1")).await;
        let report = wait_terminal(&scheduler, "job-1").await;

        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(report.progress, 0);
        assert!(report.message.starts_with("Analysis failed:"));
        assert!(report.result.is_none());

        let job = scheduler.job("job-1").await.unwrap();
        assert!(!job.error.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clip_failures_are_skipped_observations_retained() {
        let dir = TempDir::new().unwrap();
        let mut stub = StubSampler::new(3);
        stub.fail_clips = true;
        let scheduler = scheduler_with(&dir, Arc::new(stub), 0.0);

        scheduler.submit(JobId::from_string("job-1")).await;
        let report = wait_terminal(&scheduler, "job-1").await;

        assert_eq!(report.status, JobStatus::Completed);
        let result = report.result.unwrap();
        assert_eq!(result.observations.len(), 3);
        assert!(result.sample_clips.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_order_and_single_active_job() {
        let dir = TempDir::new().unwrap();
        let mut stub = StubSampler::new(1);
        stub.probe_delay = Duration::from_millis(20);
        let sampler = Arc::new(stub);
        let scheduler = scheduler_with(&dir, Arc::clone(&sampler), 0.0);

        let ids = ["job-a", "job-b", "job-c"];
        for id in ids {
            scheduler.submit(JobId::from_string(id)).await;
        }

        let mut finished = false;
        for _ in 0..2000 {
            let mut active = 0;
            let mut terminal = 0;
            for id in ids {
                let report = scheduler.status(id).await.unwrap();
                if report.status.is_active() {
                    active += 1;
                }
                if report.status.is_terminal() {
                    terminal += 1;
                }
            }
            assert!(active <= 1, "more than one job active at once");
            if terminal == ids.len() {
                finished = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(finished, "jobs did not all complete");

        let order = sampler.probe_log.lock().unwrap().clone();
        assert_eq!(order, vec!["job-a", "job-b", "job-c"]);
    }

    #[tokio::test]
    async fn test_failed_job_is_never_reactivated() {
        let dir = TempDir::new().unwrap();
        let mut stub = StubSampler::new(1);
        stub.fail_probe = true;
        let failing = Arc::new(stub);
        let scheduler = Scheduler::new(
            PipelineConfig {
                uploads_dir: dir.path().to_path_buf(),
                confidence_threshold: 0.0,
            },
            failing,
            Arc::new(MockProvider::with_delay(Duration::ZERO)),
        );

        scheduler.submit(JobId::from_string("job-a")).await;
        let first = wait_terminal(&scheduler, "job-a").await;
        assert_eq!(first.status, JobStatus::Failed);

        // Further dispatch cycles must leave the failed job untouched.
        scheduler.submit(JobId::from_string("job-b")).await;
        wait_terminal(&scheduler, "job-b").await;
        scheduler.dispatch();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let again = scheduler.status("job-a").await.unwrap();
        assert_eq!(again.status, JobStatus::Failed);
        assert_eq!(again.progress, first.progress);
        assert_eq!(again.message, first.message);
    }
}

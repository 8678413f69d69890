//! Job lifecycle types and the durable checkpoint document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::video::VideoMetadata;

/// Unique identifier for a job.
///
/// Assigned by the submission boundary; `new()` exists for boundaries
/// that generate their own ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting for the scheduler
    #[default]
    Queued,
    /// Source video is being probed and sampled
    Processing,
    /// Frames are with the analysis provider
    Analyzing,
    /// Job completed successfully
    Completed,
    /// Job failed with an error (terminal, no retry)
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check if the job currently occupies the single processing slot.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Processing | JobStatus::Analyzing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A video analysis job.
///
/// Owned exclusively by the scheduler; every mutation goes through the
/// helpers below so progress stays monotone and failed jobs stay frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Progress (0-100), non-decreasing while the job is active
    #[serde(default)]
    pub progress: u8,

    /// Probed video metadata (set once processing starts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,

    /// Extracted frame file references (set once processing starts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<String>>,

    /// Analysis result (present only when completed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,

    /// Error message (present only when failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new queued job with zero progress.
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            metadata: None,
            frames: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the status. No-op once the job has failed.
    pub fn set_status(&mut self, status: JobStatus) {
        if self.status == JobStatus::Failed {
            return;
        }
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Raise progress to `progress` (clamped to 100).
    ///
    /// Progress never decreases and freezes once the job has failed.
    pub fn set_progress(&mut self, progress: u8) {
        if self.status == JobStatus::Failed {
            return;
        }
        self.progress = self.progress.max(progress.min(100));
        self.updated_at = Utc::now();
    }

    /// Attach the final result and mark the job completed.
    pub fn complete(&mut self, result: AnalysisResult) {
        if self.status == JobStatus::Failed {
            return;
        }
        self.result = Some(result);
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.updated_at = Utc::now();
    }

    /// Mark the job failed, recording the error.
    ///
    /// Progress stays at its last successful checkpoint. The first
    /// failure wins; later calls are ignored.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status == JobStatus::Failed {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

/// Durable per-job snapshot, rewritten after every mutation.
///
/// This is the document external readers poll, so field names match the
/// persisted JSON shape. Readers must tolerate missing and unknown
/// fields so older checkpoints and newer writers can coexist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCheckpoint {
    pub job_id: JobId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u8,
    /// When this snapshot was taken
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Job> for JobCheckpoint {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            timestamp: job.updated_at,
            metadata: job.metadata.clone(),
            frames: job.frames.clone(),
            result: job.result.clone(),
            error: job.error.clone(),
        }
    }
}

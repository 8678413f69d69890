//! Status reporting for the submission/status boundary.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::job::{Job, JobCheckpoint, JobId, JobStatus};

/// Derive the human-readable message for a job state.
pub fn status_message(status: JobStatus, error: Option<&str>) -> String {
    match status {
        JobStatus::Failed => {
            format!("Analysis failed: {}", error.unwrap_or("Unknown error"))
        }
        JobStatus::Completed => "Analysis complete".to_string(),
        _ => "Your video is being analyzed. This may take a few minutes.".to_string(),
    }
}

/// What the status boundary observes for a job, built from the live
/// record or from its persisted checkpoint after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<String>>,
}

impl From<&Job> for StatusReport {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            message: status_message(job.status, job.error.as_deref()),
            result: job.result.clone(),
            frames: job.frames.clone(),
        }
    }
}

impl From<JobCheckpoint> for StatusReport {
    fn from(doc: JobCheckpoint) -> Self {
        Self {
            job_id: doc.job_id,
            status: doc.status,
            progress: doc.progress,
            message: status_message(doc.status, doc.error.as_deref()),
            result: doc.result,
            frames: doc.frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        assert_eq!(
            status_message(JobStatus::Failed, Some("No video stream found")),
            "Analysis failed: No video stream found"
        );
        assert_eq!(
            status_message(JobStatus::Failed, None),
            "Analysis failed: Unknown error"
        );
        assert_eq!(status_message(JobStatus::Completed, None), "Analysis complete");
        assert!(status_message(JobStatus::Queued, None).contains("analyzed"));
        assert!(status_message(JobStatus::Analyzing, None).contains("analyzed"));
    }

    #[test]
    fn test_report_from_live_job() {
        let mut job = Job::new(JobId::from_string("job-1"));
        job.set_status(JobStatus::Processing);
        job.set_progress(20);

        let report = StatusReport::from(&job);
        assert_eq!(report.status, JobStatus::Processing);
        assert_eq!(report.progress, 20);
        assert!(report.result.is_none());
    }

    #[test]
    fn test_report_from_checkpoint() {
        let mut job = Job::new(JobId::from_string("job-1"));
        job.fail("probe exploded");

        let report = StatusReport::from(JobCheckpoint::from(&job));
        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(report.message, "Analysis failed: probe exploded");
    }
}

//! Pipeline configuration.

use std::path::PathBuf;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory holding one subdirectory per job; checkpoints are
    /// written to `<uploads_dir>/<job_id>/job.json`.
    pub uploads_dir: PathBuf,
    /// Minimum confidence an observation needs before a sample clip is
    /// generated for it (exclusive).
    pub confidence_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            confidence_threshold: 0.8,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            uploads_dir: std::env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            confidence_threshold: std::env::var("CLIP_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.confidence_threshold),
        }
    }
}

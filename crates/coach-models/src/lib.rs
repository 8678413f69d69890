//! Shared data models for the ReplayCoach analysis pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job statuses and the durable checkpoint document
//! - Structured analysis output (observations, summary, suggestions)
//! - Probed video metadata
//! - Status reports consumed by the submission/status boundary

pub mod analysis;
pub mod job;
pub mod status;
pub mod utils;
pub mod video;

// Re-export common types
pub use analysis::{AnalysisResult, Evidence, Observation};
pub use job::{Job, JobCheckpoint, JobId, JobStatus};
pub use status::{status_message, StatusReport};
pub use utils::frame_timestamp;
pub use video::VideoMetadata;

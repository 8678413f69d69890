//! Job pipeline for ReplayCoach.
//!
//! A single-concurrency scheduler drives each submitted job through
//! `queued -> processing -> analyzing -> completed` (or `failed`),
//! delegating frame sampling to [`coach_media`] and analysis to a
//! [`coach_ai::AnalysisProvider`]. Every state mutation is mirrored to a
//! durable per-job checkpoint so external readers survive restarts.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod store;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use scheduler::Scheduler;
pub use store::{CheckpointStore, JobStore};

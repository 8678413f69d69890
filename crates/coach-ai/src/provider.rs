//! The analysis capability trait.

use async_trait::async_trait;
use std::path::PathBuf;

use coach_models::{AnalysisResult, VideoMetadata};

use crate::error::AiResult;

/// A vision-capable analysis backend.
///
/// Consumes extracted frame files plus the probed metadata and returns
/// structured feedback. Implementations prefer degrade-and-continue:
/// partial backend failures produce partial results, not errors.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(
        &self,
        frames: &[PathBuf],
        metadata: &VideoMetadata,
    ) -> AiResult<AnalysisResult>;
}

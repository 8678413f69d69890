//! Probed video metadata.

use serde::{Deserialize, Serialize};

/// Metadata extracted from a source video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VideoMetadata {
    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,
    /// Frame rate (fps)
    #[serde(default)]
    pub fps: f64,
    /// Width in pixels (0 if unknown)
    #[serde(default)]
    pub width: u32,
    /// Height in pixels (0 if unknown)
    #[serde(default)]
    pub height: u32,
}

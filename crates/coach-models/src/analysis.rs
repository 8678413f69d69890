//! Structured analysis output returned by an analysis provider.

use serde::{Deserialize, Serialize};

/// Frame-level evidence attached to an observation.
///
/// The provider stamps this from the first frame of the batch the
/// observation came from, not from the observation's own reported
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Path of the frame image backing the observation
    pub frame_url: String,
    /// Timestamp (seconds) parsed from that frame's file name
    #[serde(default)]
    pub time_index: f64,
}

/// One structured feedback item tied to a moment in the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// When the event occurs (seconds), as reported by the model
    #[serde(default)]
    pub timestamp: f64,
    /// What is happening
    pub observation: String,
    /// Specific, actionable advice
    pub suggestion: String,
    /// Model confidence in [0, 1]
    #[serde(default)]
    pub confidence: f64,
    /// Supporting frame reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

/// Complete analysis of a video, attached atomically to a job on success.
///
/// Observation order follows batch arrival order and is not necessarily
/// chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub overall_suggestions: Vec<String>,
    /// Generated sample clip paths for high-confidence observations
    #[serde(default)]
    pub sample_clips: Vec<String>,
}

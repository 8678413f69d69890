//! Deterministic mock analysis provider.

use async_trait::async_trait;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;

use coach_models::{frame_timestamp, AnalysisResult, Evidence, Observation, VideoMetadata};

use crate::error::AiResult;
use crate::provider::AnalysisProvider;

/// Canned observation texts, cycled by frame position.
const OBSERVATIONS: &[&str] = &[
    "Player demonstrates excellent crosshair placement while holding this angle",
    "Good use of utility to clear common camping positions",
    "Aggressive peek without teammate support could be risky",
    "Smart rotation timing after getting early information",
    "Resource management could be improved - holding too many unused utilities",
    "Strong mechanical aim during this engagement",
    "Positioned well to trade teammate's death",
    "Missed opportunity to gather information safely",
];

/// Canned suggestion texts, cycled by frame position.
const SUGGESTIONS: &[&str] = &[
    "Consider jiggle peeking this angle to bait out enemy utility",
    "Use smokes to isolate angles when entering the site",
    "Communicate rotation plans earlier to allow teammate setup",
    "Save utility for late-round executes",
    "Pre-aim common angles while clearing site",
    "Work with teammates to create crossfires",
    "Practice flash timings for common entry points",
    "Develop default strategies for early round control",
];

const SUMMARY: &str = "Player shows good mechanical skills but could improve positioning and \
resource management. Several key moments demonstrate both strong aim and tactical \
decision-making, though some opportunities for map control were missed.";

const OVERALL_SUGGESTIONS: &[&str] = &[
    "Focus on maintaining better map awareness and positioning",
    "Practice utility usage in key chokepoints",
    "Consider developing set plays for common situations",
    "Work on economy management and buy strategy",
];

/// Mock provider: schema-correct synthetic feedback with no external
/// calls. Produces exactly one observation per input frame.
#[derive(Debug, Clone)]
pub struct MockProvider {
    delay: Duration,
}

impl MockProvider {
    /// Create a mock with the default simulated analysis delay.
    pub fn new() -> Self {
        Self {
            delay: Duration::from_secs(2),
        }
    }

    /// Override the simulated delay (tests use zero).
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisProvider for MockProvider {
    async fn analyze(
        &self,
        frames: &[PathBuf],
        _metadata: &VideoMetadata,
    ) -> AiResult<AnalysisResult> {
        // Simulate analysis time.
        tokio::time::sleep(self.delay).await;

        let mut rng = rand::rng();
        let observations = frames
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                let timestamp = frame_timestamp(frame);
                Observation {
                    timestamp,
                    observation: OBSERVATIONS[index % OBSERVATIONS.len()].to_string(),
                    suggestion: SUGGESTIONS[index % SUGGESTIONS.len()].to_string(),
                    confidence: 0.8 + rng.random::<f64>() * 0.2,
                    evidence: Some(Evidence {
                        frame_url: frame.display().to_string(),
                        time_index: timestamp,
                    }),
                }
            })
            .collect();

        Ok(AnalysisResult {
            observations,
            summary: SUMMARY.to_string(),
            overall_suggestions: OVERALL_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            sample_clips: Vec::new(),
        })
    }
}

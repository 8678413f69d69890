//! Frame sampling and clip generation for job-scoped videos.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use coach_models::VideoMetadata;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Extensions accepted when scanning a job directory for a source video.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];

/// Sampler configuration.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Root directory holding one subdirectory per job
    pub uploads_dir: PathBuf,
    /// Seconds between extracted frames
    pub frame_interval: f64,
    /// Maximum number of frames to extract
    pub max_frames: usize,
    /// Duration of sample clips in seconds
    pub clip_duration: f64,
    /// Scale filter applied to extracted frames
    pub frame_scale: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            frame_interval: 5.0,
            max_frames: 20,
            clip_duration: 10.0,
            frame_scale: "1280:720".to_string(),
        }
    }
}

impl SamplerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            uploads_dir: std::env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            frame_interval: std::env::var("FRAME_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_interval),
            max_frames: std::env::var("MAX_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_frames),
            clip_duration: std::env::var("CLIP_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.clip_duration),
            frame_scale: std::env::var("FRAME_SCALE").unwrap_or(defaults.frame_scale),
        }
    }
}

/// Select timestamps for still-frame extraction.
///
/// Deterministic arithmetic progression: 0, interval, 2*interval, ...
/// while the point is below `duration` and fewer than `max_frames`
/// points have been produced. Empty for non-positive duration or
/// interval.
pub fn select_frame_points(duration: f64, interval: f64, max_frames: usize) -> Vec<f64> {
    let mut points = Vec::new();
    if duration <= 0.0 || interval <= 0.0 {
        return points;
    }

    let mut time = 0.0;
    while time < duration && points.len() < max_frames {
        points.push(time);
        time += interval;
    }
    points
}

/// Media operations the scheduler drives, keyed by job id.
///
/// The seam exists so pipeline tests can substitute a stub for the real
/// FFmpeg-backed sampler.
#[async_trait]
pub trait MediaSampler: Send + Sync {
    /// Locate the job's source video and probe its metadata.
    async fn probe(&self, job_id: &str) -> MediaResult<VideoMetadata>;

    /// Extract still frames at the computed sample points.
    ///
    /// The returned listing order is unspecified; callers needing
    /// chronological order must re-sort by the timestamp embedded in
    /// each file name.
    async fn extract_frames(&self, job_id: &str) -> MediaResult<Vec<PathBuf>>;

    /// Generate a bounded sample clip anchored at `start_time`.
    async fn generate_clip(&self, job_id: &str, start_time: f64) -> MediaResult<PathBuf>;
}

/// FFmpeg-backed video sampler.
#[derive(Debug, Clone)]
pub struct VideoSampler {
    config: SamplerConfig,
}

impl VideoSampler {
    /// Create a new sampler.
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Access the sampler configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Locate the source video inside the job's upload directory.
    ///
    /// Prefers a file literally prefixed `original`, otherwise the first
    /// entry carrying a known video extension.
    pub async fn find_source_video(&self, job_id: &str) -> MediaResult<PathBuf> {
        let job_dir = self.config.uploads_dir.join(job_id);
        let mut entries = tokio::fs::read_dir(&job_dir)
            .await
            .map_err(|_| MediaError::NoSourceVideo(job_dir.clone()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        let chosen = files
            .iter()
            .find(|name| name.starts_with("original"))
            .or_else(|| files.iter().find(|name| has_video_extension(name)))
            .ok_or(MediaError::NoSourceVideo(job_dir.clone()))?;

        Ok(job_dir.join(chosen))
    }

    /// Extract one still image per selected frame point.
    ///
    /// File names embed the timestamp, so re-extraction overwrites
    /// rather than duplicates.
    pub async fn extract_frames(&self, job_id: &str) -> MediaResult<Vec<PathBuf>> {
        let video_path = self.find_source_video(job_id).await?;
        let metadata = probe_video(&video_path).await?;

        let frames_dir = self.config.uploads_dir.join(job_id).join("frames");
        tokio::fs::create_dir_all(&frames_dir).await?;

        let points = select_frame_points(
            metadata.duration,
            self.config.frame_interval,
            self.config.max_frames,
        );
        debug!(job_id, points = points.len(), "extracting frames");

        let extractions = points.iter().map(|&timestamp| {
            let output = frames_dir.join(frame_file_name(timestamp));
            let cmd = FfmpegCommand::new(&video_path, &output)
                .seek(timestamp)
                .single_frame()
                .video_filter(format!("scale={}", self.config.frame_scale));
            async move { cmd.run().await }
        });
        try_join_all(extractions).await?;

        // Listing order is unspecified; the embedded timestamp is the
        // only ordering signal.
        let mut frames = Vec::new();
        let mut entries = tokio::fs::read_dir(&frames_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
                frames.push(path);
            }
        }

        info!(job_id, frames = frames.len(), "frame extraction complete");
        Ok(frames)
    }

    /// Generate a sample clip starting at `start_time`.
    ///
    /// Output naming embeds the start time, so repeated requests for the
    /// same timestamp overwrite rather than accumulate.
    pub async fn generate_clip(&self, job_id: &str, start_time: f64) -> MediaResult<PathBuf> {
        let video_path = self.find_source_video(job_id).await?;

        let samples_dir = self.config.uploads_dir.join(job_id).join("samples");
        tokio::fs::create_dir_all(&samples_dir).await?;

        let output = samples_dir.join(clip_file_name(start_time));
        FfmpegCommand::new(&video_path, &output)
            .seek(start_time)
            .duration(self.config.clip_duration)
            .run()
            .await?;

        info!(job_id, start_time, clip = %output.display(), "sample clip generated");
        Ok(output)
    }
}

#[async_trait]
impl MediaSampler for VideoSampler {
    async fn probe(&self, job_id: &str) -> MediaResult<VideoMetadata> {
        let video_path = self.find_source_video(job_id).await?;
        probe_video(&video_path).await
    }

    async fn extract_frames(&self, job_id: &str) -> MediaResult<Vec<PathBuf>> {
        VideoSampler::extract_frames(self, job_id).await
    }

    async fn generate_clip(&self, job_id: &str, start_time: f64) -> MediaResult<PathBuf> {
        VideoSampler::generate_clip(self, job_id, start_time).await
    }
}

fn has_video_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
}

fn frame_file_name(timestamp: f64) -> String {
    format!("frame-{}.jpg", timestamp.round() as u64)
}

fn clip_file_name(start_time: f64) -> String {
    format!("sample-{}.mp4", start_time.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_frame_points_progression() {
        let points = select_frame_points(12.0, 5.0, 20);
        assert_eq!(points, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_frame_points_strictly_increasing_below_duration() {
        let points = select_frame_points(61.0, 7.0, 50);
        assert_eq!(points.len(), 9);
        for pair in points.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(points.iter().all(|&p| p < 61.0));
        assert_eq!(points[0], 0.0);
    }

    #[test]
    fn test_frame_points_respect_cap() {
        let points = select_frame_points(1000.0, 5.0, 20);
        assert_eq!(points.len(), 20);
    }

    #[test]
    fn test_frame_points_empty_for_non_positive_duration() {
        assert!(select_frame_points(0.0, 5.0, 20).is_empty());
        assert!(select_frame_points(-3.0, 5.0, 20).is_empty());
        assert!(select_frame_points(10.0, 0.0, 20).is_empty());
    }

    #[test]
    fn test_output_naming_embeds_timestamp() {
        assert_eq!(frame_file_name(5.0), "frame-5.jpg");
        assert_eq!(frame_file_name(0.0), "frame-0.jpg");
        assert_eq!(clip_file_name(42.0), "sample-42.mp4");
    }

    #[test]
    fn test_video_extension_matching() {
        assert!(has_video_extension("clip.mp4"));
        assert!(has_video_extension("CLIP.MOV"));
        assert!(has_video_extension("recording.webm"));
        assert!(!has_video_extension("notes.txt"));
        assert!(!has_video_extension("mp4"));
    }

    fn sampler_for(dir: &TempDir) -> VideoSampler {
        VideoSampler::new(SamplerConfig {
            uploads_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_find_source_prefers_original_prefix() {
        let dir = TempDir::new().unwrap();
        let job_dir = dir.path().join("job-1");
        std::fs::create_dir_all(&job_dir).unwrap();
        std::fs::write(job_dir.join("extra.mp4"), b"x").unwrap();
        std::fs::write(job_dir.join("original.webm"), b"x").unwrap();

        let found = sampler_for(&dir).find_source_video("job-1").await.unwrap();
        assert_eq!(found.file_name().unwrap(), "original.webm");
    }

    #[tokio::test]
    async fn test_find_source_falls_back_to_extension() {
        let dir = TempDir::new().unwrap();
        let job_dir = dir.path().join("job-1");
        std::fs::create_dir_all(&job_dir).unwrap();
        std::fs::write(job_dir.join("job.json"), b"{}").unwrap();
        std::fs::write(job_dir.join("upload.mkv"), b"x").unwrap();

        let found = sampler_for(&dir).find_source_video("job-1").await.unwrap();
        assert_eq!(found.file_name().unwrap(), "upload.mkv");
    }

    #[tokio::test]
    async fn test_find_source_errors_when_missing() {
        let dir = TempDir::new().unwrap();
        let job_dir = dir.path().join("job-1");
        std::fs::create_dir_all(&job_dir).unwrap();
        std::fs::write(job_dir.join("job.json"), b"{}").unwrap();

        let err = sampler_for(&dir)
            .find_source_video("job-1")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NoSourceVideo(_)));
    }

    #[tokio::test]
    async fn test_find_source_errors_for_absent_job_dir() {
        let dir = TempDir::new().unwrap();
        let err = sampler_for(&dir)
            .find_source_video("nope")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NoSourceVideo(_)));
    }
}

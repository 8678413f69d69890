//! FFmpeg CLI wrapper for the ReplayCoach pipeline.
//!
//! Provides video probing (ffprobe), deterministic frame sampling and
//! bounded sample-clip generation (ffmpeg), plus discovery of the
//! job-scoped source video file.

pub mod command;
pub mod error;
pub mod probe;
pub mod sampler;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use probe::probe_video;
pub use sampler::{select_frame_points, MediaSampler, SamplerConfig, VideoSampler};

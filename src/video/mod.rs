//! # Video I/O Module
//!
//! Decodes video files into in-memory RGB frames and encodes frame sequences
//! back into video files, driving the external `ffmpeg`/`ffprobe` tools over
//! pipes.

pub mod path;
pub mod probe;
pub mod types;

mod reader;
mod stderr_tail;
mod writer;

#[cfg(all(test, unix))]
mod fake_tools;

use std::path::Path;

use crate::error::Result;

pub use path::normalize_path;
pub use probe::{check_ffmpeg_available, probe_video};
pub use reader::VideoReader;
pub use types::{Frame, VideoMetadata};
pub use writer::{VideoWriter, OUTPUT_CODEC, OUTPUT_FPS};

/// Read all frames of `video_path` with the default configuration
pub fn read_video<P: AsRef<Path>>(video_path: P) -> Result<Vec<Frame>> {
    VideoReader::default().read(video_path)
}

/// Save `output_video_frames` to `output_video_path` with the default
/// configuration
pub fn save_video<P: AsRef<Path>>(output_video_frames: &[Frame], output_video_path: P) -> Result<()> {
    VideoWriter::default().save(output_video_frames, output_video_path)
}

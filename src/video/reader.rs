use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, info};

use crate::config::VideoIoConfig;
use crate::error::{Result, VideoError};
use crate::video::path::normalize_path;
use crate::video::probe::probe_video;
use crate::video::stderr_tail::StderrTail;
use crate::video::types::{Frame, VideoMetadata};

/// Decodes a whole video file into memory, one RGB frame per video tick
#[derive(Debug, Clone, Default)]
pub struct VideoReader {
    config: VideoIoConfig,
}

impl VideoReader {
    pub fn new(config: VideoIoConfig) -> Self {
        Self { config }
    }

    /// Read every frame of the video at `path`, in presentation order.
    ///
    /// Fails with [`VideoError::NotFound`] when nothing exists at the
    /// normalized path, [`VideoError::OpenFailed`] when the container cannot
    /// be opened and [`VideoError::NoFrames`] when it opens but yields no
    /// frames.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Frame>> {
        let path = normalize_path(path);
        let path_str = path.display().to_string();

        if !path.exists() {
            return Err(VideoError::NotFound { path: path_str }.into());
        }

        let metadata = probe_video(&path, &self.config)?;

        info!("Video properties:");
        info!("- Resolution: {}x{}", metadata.width, metadata.height);
        match metadata.frame_count {
            Some(count) => info!("- Total frames: {}", count),
            None => info!("- Total frames: unknown"),
        }
        info!("- FPS: {:.2}", metadata.fps);

        let mut session = DecodeSession::open(&path, &metadata, &self.config)?;
        let frames = decode_frames(&mut session.decoder, self.config.progress_interval)?;
        session.finish()?;

        info!("Successfully read {} frames", frames.len());
        require_frames(frames, &path_str)
    }
}

/// Splits a packed `rgb24` byte stream into frames of a fixed size
pub(crate) struct FrameDecoder<R> {
    source: R,
    width: u32,
    height: u32,
}

impl<R: Read> FrameDecoder<R> {
    pub(crate) fn new(source: R, width: u32, height: u32) -> Self {
        Self { source, width, height }
    }

    /// Next frame, or `None` at a clean end of stream. A stream that ends
    /// inside a frame is an error.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame_len = Frame::byte_len(self.width, self.height);
        let mut buffer = vec![0u8; frame_len];
        let mut filled = 0;

        while filled < frame_len {
            match self.source.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }

        if filled < frame_len {
            return Err(VideoError::DecodingFailed {
                reason: format!("stream ended mid-frame ({} of {} bytes)", filled, frame_len),
            }.into());
        }

        Frame::from_rgb_bytes(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| VideoError::DecodingFailed {
                reason: format!("invalid {}x{} frame buffer", self.width, self.height),
            }.into())
    }
}

/// Drain `decoder` until end of stream, logging every `progress_interval`
/// frames
pub(crate) fn decode_frames<R: Read>(
    decoder: &mut FrameDecoder<R>,
    progress_interval: usize,
) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();

    while let Some(frame) = decoder.next_frame()? {
        frames.push(frame);

        if progress_interval > 0 && frames.len() % progress_interval == 0 {
            info!("Read {} frames...", frames.len());
        }
    }

    Ok(frames)
}

fn require_frames(frames: Vec<Frame>, path: &str) -> Result<Vec<Frame>> {
    if frames.is_empty() {
        return Err(VideoError::NoFrames { path: path.to_string() }.into());
    }
    Ok(frames)
}

/// A running `ffmpeg` process writing raw frames to its stdout.
///
/// Dropping an unfinished session kills and reaps the process.
struct DecodeSession {
    child: Child,
    decoder: FrameDecoder<ChildStdout>,
    stderr: StderrTail,
}

impl DecodeSession {
    fn open(path: &Path, metadata: &VideoMetadata, config: &VideoIoConfig) -> Result<Self> {
        let size = format!("{}x{}", metadata.width, metadata.height);

        let mut cmd = Command::new(&config.ffmpeg_path);
        cmd.args(["-nostdin", "-hide_banner", "-v", "error", "-noautorotate", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-vsync", "passthrough"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s"])
            .arg(&size)
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Spawning decoder: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| VideoError::OpenFailed {
            path: path.display().to_string(),
            reason: format!("could not run {}: {}", config.ffmpeg_path, e),
        })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::OpenFailed {
                    path: path.display().to_string(),
                    reason: "decoder output pipe unavailable".to_string(),
                }.into());
            }
        };

        let stderr = StderrTail::spawn(child.stderr.take());

        Ok(Self {
            child,
            decoder: FrameDecoder::new(stdout, metadata.width, metadata.height),
            stderr,
        })
    }

    /// Wait for the decoder to exit and check that it succeeded
    fn finish(&mut self) -> Result<()> {
        let status = self.child.wait()?;
        let detail = self.stderr.collect();

        if !status.success() {
            return Err(VideoError::DecodingFailed {
                reason: format!("ffmpeg exited with {}: {}", status, detail),
            }.into());
        }

        Ok(())
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

use std::fs::create_dir_all;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tempfile::TempPath;
use tracing::{debug, error, info};

use crate::config::VideoIoConfig;
use crate::error::{Result, VideoError};
use crate::video::path::normalize_path;
use crate::video::stderr_tail::StderrTail;
use crate::video::types::Frame;

/// Frame rate of every written video
pub const OUTPUT_FPS: u32 = 24;

/// Encoder used for every written video (Motion JPEG, FourCC `MJPG`)
pub const OUTPUT_CODEC: &str = "mjpeg";

/// Container used when the destination has no extension to pick one from
const FALLBACK_CONTAINER: &str = "avi";

/// Encodes an in-memory frame sequence into a video file
#[derive(Debug, Clone, Default)]
pub struct VideoWriter {
    config: VideoIoConfig,
}

impl VideoWriter {
    pub fn new(config: VideoIoConfig) -> Self {
        Self { config }
    }

    /// Write `frames` to `path` as Motion JPEG at [`OUTPUT_FPS`].
    ///
    /// The first frame fixes the output resolution. Every failure is logged
    /// before it is returned.
    pub fn save<P: AsRef<Path>>(&self, frames: &[Frame], path: P) -> Result<()> {
        self.try_save(frames, path.as_ref())
            .inspect_err(|e| error!("Error saving video: {}", e))
    }

    fn try_save(&self, frames: &[Frame], path: &Path) -> Result<()> {
        let path = normalize_path(path);
        let (width, height) = check_dimensions(frames)?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !dir.exists() {
                create_dir_all(dir)?;
                info!("Created output directory: {}", dir.display());
            }
        }

        info!("Preparing to write video:");
        info!("- Output path: {}", path.display());
        info!("- Frame dimensions: {}x{}", width, height);
        info!("- Number of frames: {}", frames.len());

        let mut session = EncodeSession::open(&path, width, height, &self.config)?;

        for (i, frame) in frames.iter().enumerate() {
            session.write_frame(frame)?;

            let written = i + 1;
            if written % self.config.progress_interval.max(1) == 0 {
                info!("Wrote {} frames...", written);
            }
        }

        session.finish()?;
        info!("Successfully saved video to: {}", path.display());
        Ok(())
    }
}

/// Output `(width, height)` taken from the first frame. Fails on an empty
/// sequence or on any frame whose size differs from the first.
fn check_dimensions(frames: &[Frame]) -> Result<(u32, u32)> {
    let first = frames.first().ok_or(VideoError::EmptyFrames)?;
    let expected = first.dimensions();

    if let Some((index, frame)) = frames
        .iter()
        .enumerate()
        .find(|(_, frame)| frame.dimensions() != expected)
    {
        return Err(VideoError::FrameSizeMismatch {
            index,
            expected,
            found: frame.dimensions(),
        }.into());
    }

    Ok(expected)
}

/// A running `ffmpeg` process reading raw frames from its stdin.
///
/// The encoder writes to a hidden staging file beside the destination, which
/// replaces the destination only once encoding succeeds. Dropping an
/// unfinished session kills the encoder and deletes the staging file, leaving
/// any existing destination untouched.
struct EncodeSession {
    child: Child,
    stderr: StderrTail,
    staging: Option<TempPath>,
    destination: PathBuf,
}

impl EncodeSession {
    fn open(path: &Path, width: u32, height: u32, config: &VideoIoConfig) -> Result<Self> {
        let create_failed = |reason: String| VideoError::CreateFailed {
            path: path.display().to_string(),
            reason,
        };

        if path.is_dir() {
            return Err(create_failed("destination is a directory".to_string()).into());
        }

        let staging = staging_file(path).map_err(|e| create_failed(e.to_string()))?;

        let size = format!("{}x{}", width, height);
        let fps = OUTPUT_FPS.to_string();
        let qscale = config.mjpeg_qscale().to_string();

        let mut cmd = Command::new(&config.ffmpeg_path);
        cmd.args(["-hide_banner", "-v", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s"])
            .arg(&size)
            .arg("-r")
            .arg(&fps)
            .args(["-i", "-", "-an", "-c:v", OUTPUT_CODEC, "-q:v"])
            .arg(&qscale);

        if path.extension().is_none() {
            cmd.args(["-f", FALLBACK_CONTAINER]);
        }

        cmd.arg(&*staging)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("Spawning encoder: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            create_failed(format!("could not run {}: {}", config.ffmpeg_path, e))
        })?;
        let stderr = StderrTail::spawn(child.stderr.take());

        Ok(Self {
            child,
            stderr,
            staging: Some(staging),
            destination: path.to_path_buf(),
        })
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let written = match self.child.stdin.as_mut() {
            Some(stdin) => stdin.write_all(frame.as_rgb_bytes()),
            None => {
                return Err(VideoError::EncodingFailed {
                    reason: "encoder input already closed".to_string(),
                }.into())
            }
        };

        if let Err(e) = written {
            // The encoder went away; its stderr says why
            drop(self.child.stdin.take());
            let _ = self.child.wait();
            let detail = self.stderr.collect();
            return Err(self.failure(format!("{} ({})", detail, e)).into());
        }

        Ok(())
    }

    /// Close the input so the encoder writes the container trailer, check its
    /// exit status, then move the staged file into place
    fn finish(&mut self) -> Result<()> {
        drop(self.child.stdin.take());
        let status = self.child.wait()?;
        let detail = self.stderr.collect();

        if !status.success() {
            return Err(self.failure(format!("ffmpeg exited with {}: {}", status, detail)).into());
        }

        if let Some(staging) = self.staging.take() {
            staging.persist(&self.destination).map_err(|e| VideoError::CreateFailed {
                path: self.destination.display().to_string(),
                reason: e.error.to_string(),
            })?;
        }

        Ok(())
    }

    /// An encoder that dies without writing any output never got its output
    /// open; anything later is an encoding failure
    fn failure(&self, reason: String) -> VideoError {
        let produced_output = self
            .staging
            .as_ref()
            .and_then(|staging| std::fs::metadata(staging).ok())
            .map_or(false, |metadata| metadata.len() > 0);

        if produced_output {
            VideoError::EncodingFailed { reason }
        } else {
            VideoError::CreateFailed {
                path: self.destination.display().to_string(),
                reason,
            }
        }
    }
}

impl Drop for EncodeSession {
    fn drop(&mut self) {
        drop(self.child.stdin.take());
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        // An unpersisted staging file removes itself here
    }
}

/// Hidden, initially empty file next to `path` with the same extension, so
/// the encoder still picks the container from it
fn staging_file(path: &Path) -> std::io::Result<TempPath> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let suffix = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix(".tracking-utils-").suffix(&suffix);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }

    Ok(builder.tempfile_in(dir)?.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackingError;
    use tempfile::tempdir;

    #[cfg(unix)]
    use crate::video::fake_tools::{
        config, within_timeout, write_script, MIDSTREAM_FAILING_ENCODER, NOISY_ENCODER,
        PASSTHROUGH_ENCODER, SETUP_FAILING_ENCODER,
    };

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_empty_frames_rejected_before_any_io() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("output_videos");
        let output = output_dir.join("result.avi");

        let result = VideoWriter::default().save(&[], &output);

        assert!(matches!(result, Err(TrackingError::Video(VideoError::EmptyFrames))));
        assert!(!output_dir.exists());
    }

    #[test]
    fn test_mismatched_frame_rejected_before_any_io() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("nested");
        let frames = vec![
            Frame::new_black(32, 24),
            Frame::new_black(32, 24),
            Frame::new_black(24, 32),
        ];

        let result = VideoWriter::default().save(&frames, output_dir.join("out.avi"));

        match result {
            Err(TrackingError::Video(VideoError::FrameSizeMismatch { index, expected, found })) => {
                assert_eq!(index, 2);
                assert_eq!(expected, (32, 24));
                assert_eq!(found, (24, 32));
            }
            other => panic!("Expected FrameSizeMismatch, got {:?}", other),
        }
        assert!(!output_dir.exists());
    }

    #[test]
    fn test_check_dimensions_uses_first_frame() {
        let frames = vec![Frame::new_black(8, 6), Frame::new_filled(8, 6, [1, 2, 3])];
        assert_eq!(check_dimensions(&frames).unwrap(), (8, 6));
    }

    #[test]
    fn test_missing_encoder_is_create_failure() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.avi");
        let config = VideoIoConfig {
            ffmpeg_path: "definitely-not-an-ffmpeg-binary".to_string(),
            ..VideoIoConfig::default()
        };

        let result = VideoWriter::new(config).save(&[Frame::new_black(16, 16)], &output);

        assert!(matches!(
            result,
            Err(TrackingError::Video(VideoError::CreateFailed { .. }))
        ));
        assert!(!output.exists());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_unwritable_destination_is_create_failure() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened as the output file
        let output = dir.path().join("taken");
        std::fs::create_dir(&output).unwrap();

        let result = VideoWriter::default().save(&[Frame::new_black(16, 16)], &output);

        assert!(matches!(
            result,
            Err(TrackingError::Video(VideoError::CreateFailed { .. }))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_encoder_receives_frames_in_order_at_fixed_rate() {
        let dir = tempdir().unwrap();
        let tools = dir.path().join("tools");
        std::fs::create_dir(&tools).unwrap();
        let args_log = tools.join("args.log");
        let body = format!(
            "printf '%s\\n' \"$@\" > '{}'\n{}",
            args_log.display(),
            PASSTHROUGH_ENCODER
        );
        let config = config(write_script(&tools, "fake-ffmpeg", &body), "ffprobe".to_string());

        let frames: Vec<Frame> = (0..5u8)
            .map(|i| Frame::new_filled(4, 2, [i * 40, 7, 255 - i]))
            .collect();
        let output = dir.path().join("videos/out.avi");

        VideoWriter::new(config).save(&frames, &output).unwrap();

        let expected: Vec<u8> = frames.iter().flat_map(|f| f.as_rgb_bytes().to_vec()).collect();
        assert_eq!(std::fs::read(&output).unwrap(), expected);
        assert_eq!(dir_entries(&dir.path().join("videos")), vec!["out.avi".to_string()]);

        let args = std::fs::read_to_string(&args_log).unwrap();
        let args: Vec<&str> = args.lines().collect();
        let after = |flag: &str| args.iter().position(|a| *a == flag).map(|i| args[i + 1]);
        assert_eq!(after("-r"), Some("24"));
        assert_eq!(after("-c:v"), Some(OUTPUT_CODEC));
        assert_eq!(after("-s"), Some("4x2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_encoder_setup_failure_is_create_failure() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();
        let config = config(
            write_script(tools.path(), "fake-ffmpeg", SETUP_FAILING_ENCODER),
            "ffprobe".to_string(),
        );
        let writer = VideoWriter::new(config);
        let output = dir.path().join("out.xyz");

        // Small frames fit the pipe buffer, so the failure surfaces at
        // different points from run to run
        for _ in 0..20 {
            match writer.save(&[Frame::new_black(16, 16)], &output) {
                Err(TrackingError::Video(VideoError::CreateFailed { reason, .. })) => {
                    assert!(reason.contains("Unable to find a suitable output format"), "{}", reason);
                }
                other => panic!("Expected CreateFailed, got {:?}", other),
            }
        }
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_midstream_failure_keeps_existing_video() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();
        let output = dir.path().join("match.avi");
        std::fs::write(&output, b"previous render").unwrap();

        let config = config(
            write_script(tools.path(), "fake-ffmpeg", MIDSTREAM_FAILING_ENCODER),
            "ffprobe".to_string(),
        );
        let frames = vec![Frame::new_black(32, 32); 3];

        let result = VideoWriter::new(config).save(&frames, &output);

        assert!(matches!(
            result,
            Err(TrackingError::Video(VideoError::EncodingFailed { .. }))
        ));
        assert_eq!(std::fs::read(&output).unwrap(), b"previous render");
        assert_eq!(dir_entries(dir.path()), vec!["match.avi".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_encoder_stderr_flood_does_not_stall() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();
        let config = config(
            write_script(tools.path(), "fake-ffmpeg", NOISY_ENCODER),
            "ffprobe".to_string(),
        );
        let output = dir.path().join("noisy.avi");
        let frames = vec![Frame::new_filled(64, 64, [3, 2, 1]); 40];

        let saved = output.clone();
        within_timeout(move || VideoWriter::new(config).save(&frames, &saved)).unwrap();

        assert_eq!(std::fs::metadata(&output).unwrap().len(), 40 * 64 * 64 * 3);
    }
}

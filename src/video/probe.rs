use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::config::VideoIoConfig;
use crate::error::{Result, VideoError};
use crate::video::types::VideoMetadata;

/// Check whether both configured executables (`ffmpeg` and `ffprobe`) can be
/// launched
pub fn check_ffmpeg_available(config: &VideoIoConfig) -> bool {
    tool_runs(&config.ffmpeg_path) && tool_runs(&config.ffprobe_path)
}

fn tool_runs(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    codec_name: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Query the first video stream of `path` with `ffprobe`.
///
/// Any failure to launch the probe, a non-zero exit, or a container without a
/// video stream is reported as [`VideoError::OpenFailed`].
pub fn probe_video(path: &Path, config: &VideoIoConfig) -> Result<VideoMetadata> {
    let path_str = path.display().to_string();

    let output = Command::new(&config.ffprobe_path)
        .args([
            "-v", "error",
            "-print_format", "json",
            "-show_streams",
            "-show_format",
            "-select_streams", "v:0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| VideoError::OpenFailed {
            path: path_str.clone(),
            reason: format!("could not run {}: {}", config.ffprobe_path, e),
        })?;

    if !output.status.success() {
        return Err(VideoError::OpenFailed {
            path: path_str,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }.into());
    }

    let metadata = parse_probe_output(&output.stdout).map_err(|reason| VideoError::OpenFailed {
        path: path_str,
        reason,
    })?;

    debug!("Probed {}: {:?}", path.display(), metadata);
    Ok(metadata)
}

fn parse_probe_output(json: &[u8]) -> std::result::Result<VideoMetadata, String> {
    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| format!("invalid ffprobe output: {}", e))?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => (width, height),
        _ => return Err("video stream has no resolution".to_string()),
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rational))
        .unwrap_or(0.0);

    let duration = stream
        .duration
        .or_else(|| probe.format.and_then(|format| format.duration))
        .and_then(|d| d.parse().ok());

    Ok(VideoMetadata {
        width,
        height,
        frame_count: stream.nb_frames.and_then(|n| n.parse().ok()),
        fps,
        codec: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
        duration,
    })
}

/// Parse an ffprobe rate such as `30000/1001`; `0/0` yields `None`
fn parse_rational(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => value.trim().parse().ok(),
    }
}

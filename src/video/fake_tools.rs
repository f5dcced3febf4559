//! Stand-in `ffmpeg`/`ffprobe` shell scripts so decode and encode sessions
//! can be driven without FFmpeg installed. The stand-in codec is raw `rgb24`
//! bytes stored as-is.

use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use crate::config::VideoIoConfig;
use crate::video::types::Frame;

/// Copies the file given after `-i` to stdout
pub(crate) const PASSTHROUGH_DECODER: &str = r#"
while [ $# -gt 0 ]; do
    if [ "$1" = "-i" ]; then exec cat "$2"; fi
    shift
done
exit 1
"#;

/// Floods stderr well past a pipe buffer, then decodes like the passthrough
pub(crate) const NOISY_DECODER: &str = r#"
head -c 200000 /dev/zero | tr '\0' e >&2
while [ $# -gt 0 ]; do
    if [ "$1" = "-i" ]; then exec cat "$2"; fi
    shift
done
exit 1
"#;

/// Copies stdin into the last argument (the output file)
pub(crate) const PASSTHROUGH_ENCODER: &str = r#"
for last; do :; done
exec cat > "$last"
"#;

/// Floods stderr before touching stdin, then encodes like the passthrough
pub(crate) const NOISY_ENCODER: &str = r#"
head -c 200000 /dev/zero | tr '\0' e >&2
for last; do :; done
exec cat > "$last"
"#;

/// Gives up during output setup, before reading any input
pub(crate) const SETUP_FAILING_ENCODER: &str = r#"
echo "Unable to find a suitable output format" >&2
exit 1
"#;

/// Writes part of the output, then fails
pub(crate) const MIDSTREAM_FAILING_ENCODER: &str = r#"
for last; do :; done
head -c 20 > "$last"
echo "Error while encoding frame" >&2
exit 1
"#;

/// Write an executable `sh` script and return its path
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

/// An `ffprobe` that reports a `width` x `height` raw video at 24 fps
pub(crate) fn probe_script(dir: &Path, width: u32, height: u32) -> String {
    let body = format!(
        "cat <<'EOF'\n{{\"streams\":[{{\"codec_name\":\"rawvideo\",\"width\":{},\"height\":{},\"avg_frame_rate\":\"24/1\"}}],\"format\":{{}}}}\nEOF\n",
        width, height
    );
    write_script(dir, "fake-ffprobe", &body)
}

pub(crate) fn config(ffmpeg_path: String, ffprobe_path: String) -> VideoIoConfig {
    VideoIoConfig {
        ffmpeg_path,
        ffprobe_path,
        progress_interval: 2,
        ..VideoIoConfig::default()
    }
}

/// Packed bytes of solid frames, one per color
pub(crate) fn raw_frames(colors: &[[u8; 3]], width: u32, height: u32) -> Vec<u8> {
    colors
        .iter()
        .flat_map(|color| Frame::new_filled(width, height, *color).as_rgb_bytes().to_vec())
        .collect()
}

/// Run `f` on its own thread and fail the test if it has not returned in 10s
pub(crate) fn within_timeout<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(Duration::from_secs(10))
        .expect("video session did not finish within 10s")
}

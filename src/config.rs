use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for tracking-utils
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Video decode/encode settings
    #[serde(default)]
    pub video: VideoIoConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.video.validate()
    }
}

/// Settings for the external FFmpeg facility used to read and write videos
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoIoConfig {
    /// Executable used to decode and encode frames
    pub ffmpeg_path: String,

    /// Executable used to query container metadata
    pub ffprobe_path: String,

    /// Number of frames between progress log lines
    pub progress_interval: usize,

    /// Output quality (0-100, higher is better)
    pub quality: u8,
}

impl Default for VideoIoConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            progress_interval: 100,
            quality: 90,
        }
    }
}

impl VideoIoConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.ffmpeg_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.ffmpeg_path".to_string(),
                value: self.ffmpeg_path.clone()
            }.into());
        }

        if self.ffprobe_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.ffprobe_path".to_string(),
                value: self.ffprobe_path.clone()
            }.into());
        }

        if self.progress_interval == 0 {
            return Err(ConfigError::InvalidValue {
                key: "video.progress_interval".to_string(),
                value: self.progress_interval.to_string()
            }.into());
        }

        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "video.quality".to_string(),
                value: self.quality.to_string()
            }.into());
        }

        Ok(())
    }

    /// Map the 0-100 quality onto the MJPEG quantizer scale (2 best, 31 worst)
    pub(crate) fn mjpeg_qscale(&self) -> u8 {
        let quality = self.quality.min(100) as f32 / 100.0;
        (31.0 - quality * 29.0).round() as u8
    }
}

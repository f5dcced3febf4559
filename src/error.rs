use thiserror::Error;

/// Main error type for the tracking-utils library
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Video file not found at path: {path}")]
    NotFound { path: String },

    #[error("Failed to open video file: {path} ({reason})")]
    OpenFailed { path: String, reason: String },

    #[error("No frames were read from the video file: {path}")]
    NoFrames { path: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("The output video frames list is empty")]
    EmptyFrames,

    #[error("Frame {index} is {found:?}, expected {expected:?} (width, height)")]
    FrameSizeMismatch {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Failed to create output video file: {path} ({reason})")]
    CreateFailed { path: String, reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using TrackingError
pub type Result<T> = std::result::Result<T, TrackingError>;

impl TrackingError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::NotFound { path }) => {
                format!("Video file '{}' does not exist. Please check the path.", path)
            }
            Self::Video(VideoError::OpenFailed { path, .. }) => {
                format!(
                    "Could not open video file '{}'. Please check it is a supported format and that FFmpeg is installed.",
                    path
                )
            }
            Self::Video(VideoError::CreateFailed { path, .. }) => {
                format!(
                    "Could not create video file '{}'. Please check the destination is writable and that FFmpeg is installed.",
                    path
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

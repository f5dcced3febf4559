//! # Tracking-Utils
//!
//! Small building blocks for object-tracking video pipelines: bounding-box
//! geometry and whole-file video frame I/O.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tracking_utils::{
//!     geometry::{get_foot_position, measure_distance},
//!     video::{read_video, save_video},
//! };
//!
//! # fn main() -> tracking_utils::Result<()> {
//! let frames = read_video("input_videos/match.mp4")?;
//!
//! let player = get_foot_position([120.0, 80.0, 160.0, 200.0]);
//! let ball = (150.0, 190.0);
//! println!("player is {:.1}px from the ball", measure_distance(player, ball));
//!
//! save_video(&frames, "output_videos/match.avi")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`geometry`] - Bounding-box accessors and point distances
//! - [`video`] - Video decoding and encoding through FFmpeg
//! - [`config`] - Configuration management
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod geometry;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::{Config, VideoIoConfig},
    error::{Result, TrackingError},
    geometry::{
        get_bbox_width, get_center_of_bbox, get_foot_position, measure_distance,
        measure_xy_distance, BoundingBox, Point,
    },
    video::{read_video, save_video, Frame, VideoReader, VideoWriter},
};

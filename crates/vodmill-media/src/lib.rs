//! FFmpeg invocation for the vodmill transcoding pipeline.
//!
//! This crate provides:
//! - A command builder and supervised runner with timeout and cancellation
//! - The pipeline's single fixed transformation: downscale to a 360-pixel
//!   frame height with the aspect ratio preserved

pub mod command;
pub mod error;
pub mod transcode;

pub use command::{check_engine, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use transcode::{TranscodeSettings, Transcoder, DEFAULT_TARGET_HEIGHT};

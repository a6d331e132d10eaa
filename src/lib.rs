//! Capture remuxer
//!
//! Turns a file of length-prefixed, timestamped audio records into a
//! playable media file: records are decoded, optionally time-stretched,
//! re-chunked to the encoder's frame size, encoded and muxed.

pub mod audio;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod error;
pub mod ffmpeg_utils;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod transcode;

#[cfg(test)]
pub(crate) mod tests;

pub use error::{AppError, Result};
pub use ffmpeg_utils::version_info as ffmpeg_version_info;
pub use ffmpeg_utils::{init, install_log_filter};
pub use pipeline::{run, RunSummary};

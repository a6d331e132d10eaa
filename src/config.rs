//! Runtime configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::record::HEADER_LEN;
use crate::transcode::stretch::{MAX_TEMPO, MIN_TEMPO};

/// How captured payloads are decoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// FFmpeg decoder name
    pub codec: String,

    /// Sample rate the payloads were encoded at
    pub sample_rate: u32,

    /// Channel count of the payloads (1 or 2)
    pub channels: u16,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            codec: crate::transcode::decoder::DEFAULT_CODEC.to_string(),
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Encoder overrides; the muxer picks the codec
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Encode at this rate instead of the decoded rate
    pub sample_rate: Option<u32>,

    /// Encoder bit rate in bps
    pub bit_rate: Option<usize>,
}

/// Optional tempo change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StretchConfig {
    /// Playback speed factor; `None` or 1.0 disables the stretcher
    pub tempo: Option<f64>,
}

impl StretchConfig {
    /// Tempo to apply, if it changes anything.
    pub fn active_tempo(&self) -> Option<f64> {
        self.tempo.filter(|t| (t - 1.0).abs() > f64::EPSILON)
    }
}

/// Capture reader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Initial read buffer size in bytes; grown on demand for larger records
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { buffer_size: 4096 }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Everything one run needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Capture file to read
    pub input: PathBuf,

    /// Media file to write; the extension picks the container
    pub output: PathBuf,

    pub decoder: DecoderConfig,
    pub encoder: OutputConfig,
    pub stretch: StretchConfig,
    pub reader: ReaderConfig,
    pub logging: LoggingConfig,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl AppConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.as_os_str().is_empty() {
            return Err(invalid("input", "no input file given"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(invalid("output", "no output file given"));
        }
        if self.decoder.codec.trim().is_empty() {
            return Err(invalid("decoder.codec", "must not be empty"));
        }
        if self.decoder.sample_rate == 0 {
            return Err(invalid("decoder.sample_rate", "must be positive"));
        }
        if !(1..=2).contains(&self.decoder.channels) {
            return Err(invalid(
                "decoder.channels",
                format!("{} channels; only 1 or 2 are supported", self.decoder.channels),
            ));
        }
        if self.encoder.sample_rate == Some(0) {
            return Err(invalid("encoder.sample_rate", "must be positive"));
        }
        if self.encoder.bit_rate == Some(0) {
            return Err(invalid("encoder.bit_rate", "must be positive"));
        }
        if let Some(tempo) = self.stretch.tempo {
            if !(MIN_TEMPO..=MAX_TEMPO).contains(&tempo) {
                return Err(invalid(
                    "stretch.tempo",
                    format!("{} is outside [{}, {}]", tempo, MIN_TEMPO, MAX_TEMPO),
                ));
            }
        }
        if self.reader.buffer_size < HEADER_LEN {
            return Err(invalid(
                "reader.buffer_size",
                format!("must hold at least the {} byte header", HEADER_LEN),
            ));
        }
        Ok(())
    }
}

//! Configuration file support
//!
//! Loads run settings from TOML. Every section is optional; anything left
//! out keeps its default. Input and output paths come from the command line.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{
    AppConfig, DecoderConfig, LogFormat, LoggingConfig, OutputConfig, ReaderConfig,
    StretchConfig,
};
use crate::error::ConfigError;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Payload decoder settings
    pub decoder: Option<DecoderSettings>,
    /// Encoder overrides
    pub encoder: Option<EncoderSettings>,
    /// Tempo change
    pub stretch: Option<StretchSettings>,
    /// Capture reader settings
    pub reader: Option<ReaderSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderSettings {
    /// FFmpeg decoder name
    pub codec: Option<String>,
    /// Payload sample rate
    pub sample_rate: Option<u32>,
    /// Payload channel count
    pub channels: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Output sample rate
    pub sample_rate: Option<u32>,
    /// Bit rate in bps
    pub bit_rate: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StretchSettings {
    /// Playback speed factor
    pub tempo: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSettings {
    /// Read buffer size in bytes
    pub buffer_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<LogFormat>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Generate a file with every setting spelled out at its default
    pub fn default_config() -> Self {
        let defaults = AppConfig::default();
        Self {
            decoder: Some(DecoderSettings {
                codec: Some(defaults.decoder.codec),
                sample_rate: Some(defaults.decoder.sample_rate),
                channels: Some(defaults.decoder.channels),
            }),
            encoder: Some(EncoderSettings {
                sample_rate: None,
                bit_rate: None,
            }),
            stretch: Some(StretchSettings { tempo: Some(1.0) }),
            reader: Some(ReaderSettings {
                buffer_size: Some(defaults.reader.buffer_size),
            }),
            logging: Some(LoggingSettings {
                level: Some(defaults.logging.level),
                format: Some(defaults.logging.format),
            }),
        }
    }

    /// Convert to AppConfig, filling gaps with defaults
    pub fn into_app_config(self) -> AppConfig {
        let decoder_defaults = DecoderConfig::default();
        let decoder = match self.decoder {
            Some(d) => DecoderConfig {
                codec: d.codec.unwrap_or(decoder_defaults.codec),
                sample_rate: d.sample_rate.unwrap_or(decoder_defaults.sample_rate),
                channels: d.channels.unwrap_or(decoder_defaults.channels),
            },
            None => decoder_defaults,
        };

        let logging_defaults = LoggingConfig::default();
        let logging = match self.logging {
            Some(l) => LoggingConfig {
                level: l.level.unwrap_or(logging_defaults.level),
                format: l.format.unwrap_or(logging_defaults.format),
            },
            None => logging_defaults,
        };

        AppConfig {
            decoder,
            encoder: self
                .encoder
                .map(|e| OutputConfig {
                    sample_rate: e.sample_rate,
                    bit_rate: e.bit_rate,
                })
                .unwrap_or_default(),
            stretch: StretchConfig {
                tempo: self.stretch.and_then(|s| s.tempo),
            },
            reader: ReaderConfig {
                buffer_size: self
                    .reader
                    .and_then(|r| r.buffer_size)
                    .unwrap_or(ReaderConfig::default().buffer_size),
            },
            logging,
            ..AppConfig::default()
        }
    }
}

//! Command line interface
//!
//! Flags override the config file, which overrides built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, LogFormat};
use crate::config_file::ConfigFile;
use crate::error::ConfigError;

/// Convert a capture of length-prefixed audio records into a media file.
#[derive(Parser, Debug, Clone)]
#[command(name = "tlv-remux")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Capture file to read
    pub input: PathBuf,

    /// Media file to write; the extension picks the container (.wav, .m4a, .ogg, ...)
    pub output: PathBuf,

    /// TOML configuration file
    #[arg(short, long, env = "TLV_REMUX_CONFIG")]
    pub config: Option<PathBuf>,

    /// FFmpeg decoder for the record payloads
    #[arg(long)]
    pub codec: Option<String>,

    /// Sample rate the payloads were encoded at
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Channel count of the payloads (1 or 2)
    #[arg(long)]
    pub channels: Option<u16>,

    /// Encode at this sample rate instead of the decoded one
    #[arg(long)]
    pub output_rate: Option<u32>,

    /// Encoder bit rate in bps
    #[arg(long)]
    pub bit_rate: Option<usize>,

    /// Playback speed factor (0.5 to 100); pitch is preserved
    #[arg(long)]
    pub tempo: Option<f64>,

    /// Initial read buffer size in bytes; grown for larger records
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Merge the config file (if any) and flags into a validated config.
    pub fn into_app_config(self) -> Result<AppConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => ConfigFile::from_file(path)?,
            None => ConfigFile::default(),
        };
        let mut config = file.into_app_config();

        config.input = self.input;
        config.output = self.output;
        if let Some(codec) = self.codec {
            config.decoder.codec = codec;
        }
        if let Some(rate) = self.sample_rate {
            config.decoder.sample_rate = rate;
        }
        if let Some(channels) = self.channels {
            config.decoder.channels = channels;
        }
        if let Some(rate) = self.output_rate {
            config.encoder.sample_rate = Some(rate);
        }
        if let Some(bit_rate) = self.bit_rate {
            config.encoder.bit_rate = Some(bit_rate);
        }
        if let Some(tempo) = self.tempo {
            config.stretch.tempo = Some(tempo);
        }
        if let Some(size) = self.buffer_size {
            config.reader.buffer_size = size;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_positional_paths_and_defaults() {
        let cli = Cli::try_parse_from(["tlv-remux", "in.tlv", "out.wav"]).unwrap();
        let config = cli.into_app_config().unwrap();
        assert_eq!(config.input, PathBuf::from("in.tlv"));
        assert_eq!(config.output, PathBuf::from("out.wav"));
        assert_eq!(config.decoder.codec, "opus");
        assert!(config.encoder.sample_rate.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[decoder]\nsample_rate = 48000\nchannels = 2").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "tlv-remux",
            "in.tlv",
            "out.m4a",
            "--config",
            &path,
            "--channels",
            "1",
            "--output-rate",
            "44100",
            "--log-format",
            "json",
        ])
        .unwrap();
        let config = cli.into_app_config().unwrap();
        assert_eq!(config.decoder.sample_rate, 48000);
        assert_eq!(config.decoder.channels, 1);
        assert_eq!(config.encoder.sample_rate, Some(44100));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_flag_value_fails_validation() {
        let cli =
            Cli::try_parse_from(["tlv-remux", "in.tlv", "out.wav", "--tempo", "200"]).unwrap();
        assert!(matches!(
            cli.into_app_config(),
            Err(ConfigError::Invalid { field: "stretch.tempo", .. })
        ));
    }

    #[test]
    fn test_missing_output_is_a_usage_error() {
        assert!(Cli::try_parse_from(["tlv-remux", "in.tlv"]).is_err());
    }
}

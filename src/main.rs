//! tlv-remux
//!
//! Converts a capture file of length-prefixed audio records into a media
//! file. The run summary is printed to stdout as JSON; logs go to stderr.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tlv_remux::cli::Cli;
use tlv_remux::config::{LogFormat, LoggingConfig};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "tlv-remux";

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.into_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", APP_NAME, e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    tracing::info!("FFmpeg version: {}", tlv_remux::ffmpeg_version_info());

    if let Err(e) = tlv_remux::init() {
        eprintln!("{}: {}", APP_NAME, e);
        return ExitCode::FAILURE;
    }
    tlv_remux::install_log_filter();

    match tlv_remux::run(&config) {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize run summary"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Remux failed");
            eprintln!("{}: {}", APP_NAME, error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

/// Render an error and all of its sources on one line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Initialize logging with tracing
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate and to FFmpeg's forwarded messages.
fn init_logging(logging: &LoggingConfig) {
    let directive = if logging.level.contains('=') {
        logging.level.clone()
    } else {
        format!("tlv_remux={0},ffmpeg={0}", logging.level)
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| directive.into());

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

//! Thin layer over `ffmpeg-next`
//!
//! - Library start-up and the `tracing` bridge for libav* log lines
//! - Output context allocation and file opening (`io`)
//! - Raw plane and channel accessors (`helpers`)

pub mod helpers;
pub mod io;

pub use ffmpeg_next as ffmpeg;

use std::ffi::{c_char, c_int, c_void, CStr};

use ffmpeg_next::ffi;

use crate::error::AppError;

/// Start FFmpeg. Call once before opening any decoder or output.
pub fn init() -> Result<(), AppError> {
    ffmpeg::init().map_err(|e| AppError::FfmpegInit(e.to_string()))?;
    tracing::debug!("FFmpeg ready");
    Ok(())
}

/// Route libav* log lines through `tracing` under the `ffmpeg` target.
///
/// Only warnings and errors are forwarded. Must run after [`init`] and
/// before any codec is opened; the callback is process-global.
pub fn install_log_filter() {
    // SAFETY: plain stores into libavutil globals, done once at start-up
    // before other threads touch FFmpeg.
    unsafe {
        ffi::av_log_set_level(ffi::AV_LOG_WARNING as c_int);
        ffi::av_log_set_callback(Some(forward_log_line));
    }
}

/// Lines that repeat a decode failure the pipeline already logs per record.
const PER_RECORD_NOISE: &[&str] = &[
    "Error parsing Opus packet header",
    "Could not update timestamps for skipped samples",
    "Could not update timestamps for discarded samples",
    "Error decoding",
    "Invalid PCM packet",
];

/// How a libav* level maps onto `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warn,
    Debug,
}

fn severity(level: c_int) -> Severity {
    if level <= ffi::AV_LOG_ERROR as c_int {
        Severity::Error
    } else if level <= ffi::AV_LOG_WARNING as c_int {
        Severity::Warn
    } else {
        Severity::Debug
    }
}

fn is_noise(line: &str) -> bool {
    line.is_empty() || PER_RECORD_NOISE.iter().any(|n| line.contains(n))
}

unsafe extern "C" fn forward_log_line(
    avcl: *mut c_void,
    level: c_int,
    fmt: *const c_char,
    vl: ffi::va_list,
) {
    if level > ffi::av_log_get_level() {
        return;
    }

    let mut line = [0 as c_char; 1024];
    let mut print_prefix: c_int = 1;
    // SAFETY: `line` outlives the call and its length is passed along;
    // av_log_format_line always NUL-terminates within that length.
    ffi::av_log_format_line(
        avcl,
        level,
        fmt,
        vl,
        line.as_mut_ptr(),
        line.len() as c_int,
        &mut print_prefix,
    );
    let text = CStr::from_ptr(line.as_ptr()).to_string_lossy();
    let text = text.trim_end();
    if is_noise(text) {
        return;
    }

    match severity(level) {
        Severity::Error => tracing::error!(target: "ffmpeg", "{}", text),
        Severity::Warn => tracing::warn!(target: "ffmpeg", "{}", text),
        Severity::Debug => tracing::debug!(target: "ffmpeg", "{}", text),
    }
}

/// libavutil version, for the start-up banner.
pub fn version_info() -> String {
    let v = ffmpeg::util::version();
    format!("libavutil {}.{}.{}", v >> 16, (v >> 8) & 0xff, v & 0xff)
}

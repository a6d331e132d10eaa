//! Test fixtures
//!
//! Captures are synthesised on the fly: a sine tone is cut into 20 ms
//! records whose payloads are raw `pcm_s16le`, so the built-in PCM decoder
//! stands in for Opus and every sample can be accounted for.

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::ffmpeg_utils::ffmpeg;
use crate::record::{encode_record, RecordHeader};

/// Payload sample rate of synthesised captures
pub const RATE: u32 = 16000;

/// Samples per record (20 ms at 16 kHz)
pub const SAMPLES_PER_RECORD: usize = 320;

/// Capture clock of the first record, in milliseconds
pub const FIRST_CAPTURE_MS: u64 = 1_700_000_000_000;

/// Mono 16-bit little-endian sine samples starting at sample `start`.
pub fn sine_s16le(start: usize, samples: usize) -> Vec<u8> {
    (start..start + samples)
        .map(|i| {
            let t = i as f64 / RATE as f64;
            ((t * 440.0 * std::f64::consts::TAU).sin() * 10_000.0) as i16
        })
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

/// One record per 20 ms of tone, with consecutive sequence numbers.
pub fn tone_records(count: usize) -> Vec<(RecordHeader, Vec<u8>)> {
    (0..count)
        .map(|i| {
            let header = RecordHeader {
                marker: i == 0,
                sequence: i as u16,
                rtp_timestamp: (i * SAMPLES_PER_RECORD) as u32,
                capture_timestamp: FIRST_CAPTURE_MS + 20 * i as u64,
            };
            (header, sine_s16le(i * SAMPLES_PER_RECORD, SAMPLES_PER_RECORD))
        })
        .collect()
}

/// Serialise records into capture file bytes.
pub fn encode_capture(records: &[(RecordHeader, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (header, payload) in records {
        encode_record(&mut out, header, payload).unwrap();
    }
    out
}

/// Write capture bytes to `dir/name` and return the path.
pub fn write_capture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Config for decoding a synthesised capture.
pub fn pcm_config(input: PathBuf, output: PathBuf) -> AppConfig {
    let mut config = AppConfig {
        input,
        output,
        ..Default::default()
    };
    config.decoder.codec = "pcm_s16le".to_string();
    config.decoder.sample_rate = RATE;
    config.decoder.channels = 1;
    config
}

/// Decode the first audio stream of a finished file and count its samples.
pub fn decoded_samples(path: &Path) -> usize {
    let mut input = ffmpeg::format::input(&path).unwrap();
    let stream = input.streams().best(ffmpeg::media::Type::Audio).unwrap();
    let index = stream.index();
    let context = ffmpeg::codec::Context::from_parameters(stream.parameters()).unwrap();
    let mut decoder = context.decoder().audio().unwrap();

    let mut total = 0;
    let mut frame = ffmpeg::util::frame::Audio::empty();
    for (stream, packet) in input.packets() {
        if stream.index() != index {
            continue;
        }
        decoder.send_packet(&packet).unwrap();
        while decoder.receive_frame(&mut frame).is_ok() {
            total += frame.samples();
        }
    }
    decoder.send_eof().unwrap();
    while decoder.receive_frame(&mut frame).is_ok() {
        total += frame.samples();
    }
    total
}

/// Codec of the first audio stream of a finished file.
pub fn audio_codec(path: &Path) -> ffmpeg::codec::Id {
    let input = ffmpeg::format::input(&path).unwrap();
    let stream = input.streams().best(ffmpeg::media::Type::Audio).unwrap();
    let id = stream.parameters().id();
    id
}

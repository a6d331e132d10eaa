//! End-to-end runs: synthesised capture in, finished media file out

use super::fixtures::*;
use crate::error::AppError;
use crate::ffmpeg_utils::ffmpeg;
use crate::pipeline::run;
use crate::record::RecordHeader;

#[test]
fn test_capture_to_wav_keeps_every_sample() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "tone.tlv", &encode_capture(&tone_records(50)));
    let output = dir.path().join("tone.wav");

    let summary = run(&pcm_config(input, output.clone())).unwrap();

    assert_eq!(summary.records, 50);
    assert_eq!(summary.payload_bytes, 50 * SAMPLES_PER_RECORD as u64 * 2);
    assert_eq!(summary.decode_errors, 0);
    assert_eq!(summary.sequence_gaps, 0);
    assert!(!summary.truncated);
    assert_eq!(summary.samples_decoded, 16000);
    assert_eq!(summary.samples_written, 16000);
    assert_eq!(summary.first_capture_timestamp, Some(FIRST_CAPTURE_MS));
    assert_eq!(summary.last_capture_timestamp, Some(FIRST_CAPTURE_MS + 49 * 20));

    assert_eq!(audio_codec(&output), ffmpeg::codec::Id::PCM_S16LE);
    assert_eq!(decoded_samples(&output), 16000);
}

#[test]
fn test_capture_to_m4a() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "tone.tlv", &encode_capture(&tone_records(50)));
    let output = dir.path().join("tone.m4a");

    let summary = run(&pcm_config(input, output.clone())).unwrap();

    assert_eq!(summary.samples_written, 16000);
    // 15 full AAC frames and a 640-sample tail
    assert_eq!(summary.frames, 16);
    assert!(summary.packets > 0);
    assert_eq!(audio_codec(&output), ffmpeg::codec::Id::AAC);
}

#[test]
fn test_truncated_capture_ends_cleanly() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = encode_capture(&tone_records(10));
    // Cut the last record in half
    bytes.truncate(bytes.len() - SAMPLES_PER_RECORD);
    let input = write_capture(dir.path(), "cut.tlv", &bytes);
    let output = dir.path().join("cut.wav");

    let summary = run(&pcm_config(input, output.clone())).unwrap();

    assert!(summary.truncated);
    assert_eq!(summary.records, 9);
    assert_eq!(decoded_samples(&output), 9 * SAMPLES_PER_RECORD);
}

#[test]
fn test_trailing_partial_header_ends_cleanly() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = encode_capture(&tone_records(3));
    bytes.extend_from_slice(&[0x40, 0x02, 0x00, 0x07]);
    let input = write_capture(dir.path(), "tail.tlv", &bytes);
    let output = dir.path().join("tail.wav");

    let summary = run(&pcm_config(input, output)).unwrap();
    assert!(summary.truncated);
    assert_eq!(summary.records, 3);
}

#[test]
fn test_gaps_and_bad_payloads_are_counted_and_skipped() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut records = tone_records(10);
    // Drop records 4 and 5 from the capture
    records.drain(4..6);
    // A one-byte PCM payload can't hold a sample
    records.push((
        RecordHeader {
            sequence: 10,
            ..Default::default()
        },
        vec![0x01],
    ));
    let input = write_capture(dir.path(), "lossy.tlv", &encode_capture(&records));
    let output = dir.path().join("lossy.wav");

    let summary = run(&pcm_config(input, output.clone())).unwrap();

    assert_eq!(summary.records, 9);
    assert_eq!(summary.sequence_gaps, 1);
    assert_eq!(summary.missing_records, 2);
    assert_eq!(summary.decode_errors, 1);
    assert_eq!(summary.samples_written, 8 * SAMPLES_PER_RECORD as u64);
    assert_eq!(decoded_samples(&output), 8 * SAMPLES_PER_RECORD);
}

#[test]
fn test_tempo_shortens_output() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "tone.tlv", &encode_capture(&tone_records(50)));
    let output = dir.path().join("fast.wav");

    let mut config = pcm_config(input, output);
    config.stretch.tempo = Some(2.0);
    let summary = run(&config).unwrap();

    assert_eq!(summary.samples_decoded, 16000);
    assert!(
        (7000..=9000).contains(&summary.samples_written),
        "expected about 8000 samples, got {}",
        summary.samples_written
    );
}

#[test]
fn test_output_rate_upsamples() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "tone.tlv", &encode_capture(&tone_records(50)));
    let output = dir.path().join("up.wav");

    let mut config = pcm_config(input, output.clone());
    config.encoder.sample_rate = Some(48000);
    let summary = run(&config).unwrap();

    let written = summary.samples_written as i64;
    assert!((written - 48000).abs() <= 96, "got {} samples", written);
    assert_eq!(decoded_samples(&output) as i64, written);
}

#[test]
fn test_empty_capture_still_finalizes() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "empty.tlv", &[]);
    let output = dir.path().join("empty.m4a");

    let summary = run(&pcm_config(input, output.clone())).unwrap();
    assert_eq!(summary.records, 0);
    assert_eq!(summary.samples_written, 0);
    assert!(ffmpeg::format::input(&output).is_ok());
}

#[test]
fn test_missing_capture_fails_before_output() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("never.wav");

    let result = run(&pcm_config(dir.path().join("missing.tlv"), output.clone()));
    assert!(matches!(result, Err(AppError::Record(_))));
    assert!(!output.exists());
}

#[test]
fn test_unknown_output_container_fails() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "tone.tlv", &encode_capture(&tone_records(1)));

    let result = run(&pcm_config(input, dir.path().join("out.not-a-container")));
    assert!(matches!(result, Err(AppError::DumperInit(_))));
}

#[test]
fn test_unknown_payload_codec_fails() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "tone.tlv", &encode_capture(&tone_records(1)));

    let mut config = pcm_config(input, dir.path().join("out.wav"));
    config.decoder.codec = "no-such-codec".to_string();
    assert!(matches!(run(&config), Err(AppError::Decode(_))));
}

#[test]
fn test_record_larger_than_read_buffer() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();

    // Ten records' worth of tone in one 6415-byte record, between two small ones
    let mut records = tone_records(12);
    let big: Vec<u8> = (1..11).flat_map(|i| records[i].1.clone()).collect();
    records[1].1 = big;
    records.drain(2..11);
    records[2].0.sequence = 2;
    let input = write_capture(dir.path(), "big.tlv", &encode_capture(&records));
    let output = dir.path().join("big.wav");

    let config = pcm_config(input, output.clone());
    assert_eq!(config.reader.buffer_size, 4096);
    let summary = run(&config).unwrap();

    assert_eq!(summary.records, 3);
    assert!(!summary.truncated);
    assert_eq!(summary.decode_errors, 0);
    assert_eq!(summary.samples_written, 12 * SAMPLES_PER_RECORD as u64);
    assert_eq!(decoded_samples(&output), 12 * SAMPLES_PER_RECORD);
}

#[test]
fn test_truncated_oversized_final_record_ends_cleanly() {
    ffmpeg::init().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut bytes = encode_capture(&tone_records(3));
    // Final header declares 5000 bytes but only 100 follow
    let mut tail = vec![0u8; 100];
    tail[..2].copy_from_slice(&5000u16.to_le_bytes());
    bytes.extend_from_slice(&tail);
    let input = write_capture(dir.path(), "cut-big.tlv", &bytes);
    let output = dir.path().join("cut-big.wav");

    let summary = run(&pcm_config(input, output.clone())).unwrap();

    assert!(summary.truncated);
    assert_eq!(summary.records, 3);
    assert_eq!(decoded_samples(&output), 3 * SAMPLES_PER_RECORD);
}

//! Capture-to-media driver
//!
//! Reads records, decodes their payloads, optionally changes tempo, and
//! hands the PCM to the output stage. Runs on the calling thread until the
//! capture is exhausted.

use serde::Serialize;

use crate::audio::SampleSpec;
use crate::config::AppConfig;
use crate::error::{AppError, ConfigError, RecordError, Result};
use crate::ffmpeg_utils::{ffmpeg, helpers};
use crate::output::{AudioDumper, DumperOptions, MAX_FRAME_SIZE};
use crate::record::{RecordReader, SequenceEvent, SequenceTracker};
use crate::transcode::{AtempoStretcher, PayloadDecoder, TimeStretcher};

/// Counters for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Records read
    pub records: u64,
    /// Payload bytes read, headers excluded
    pub payload_bytes: u64,
    /// Payloads the decoder rejected
    pub decode_errors: u64,
    /// Forward jumps in the sequence number
    pub sequence_gaps: u64,
    /// Records lost in those jumps
    pub missing_records: u64,
    /// Records that arrived behind a later one
    pub reordered_records: u64,
    /// The capture ended in a damaged record
    pub truncated: bool,
    /// Capture clock of the first and last record
    pub first_capture_timestamp: Option<u64>,
    pub last_capture_timestamp: Option<u64>,
    /// Samples out of the decoder
    pub samples_decoded: u64,
    /// Samples into the encoder
    pub samples_written: u64,
    pub frames: u64,
    pub packets: u64,
}

/// Pushes PCM through the optional stretcher into the dumper in chunks the
/// dumper accepts.
struct Feeder {
    dumper: AudioDumper,
    stretcher: Option<Box<dyn TimeStretcher>>,
    spec: SampleSpec,
    scratch: Vec<Vec<u8>>,
}

impl Feeder {
    fn new(dumper: AudioDumper, stretcher: Option<Box<dyn TimeStretcher>>, spec: SampleSpec) -> Self {
        let scratch = match stretcher.as_ref().map(|s| s.spec()) {
            Some(out) => (0..out.planes())
                .map(|_| vec![0u8; out.plane_bytes(MAX_FRAME_SIZE)])
                .collect(),
            None => Vec::new(),
        };
        Self {
            dumper,
            stretcher,
            spec,
            scratch,
        }
    }

    fn push(&mut self, planes: &[&[u8]], samples: usize) -> Result<()> {
        match self.stretcher.as_mut() {
            Some(stretcher) => {
                stretcher.process(planes, samples, false)?;
                self.drain_stretcher()
            }
            None => self.dump_chunked(planes, samples),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(stretcher) = self.stretcher.as_mut() {
            stretcher.process(&[], 0, true)?;
            self.drain_stretcher()?;
        }
        self.dumper.dump(None, 0)?;
        Ok(())
    }

    fn drain_stretcher(&mut self) -> Result<()> {
        loop {
            let Some(stretcher) = self.stretcher.as_mut() else {
                return Ok(());
            };
            if stretcher.available() == 0 {
                return Ok(());
            }
            let mut out: Vec<&mut [u8]> = self.scratch.iter_mut().map(|p| &mut p[..]).collect();
            let samples = stretcher.retrieve(&mut out, MAX_FRAME_SIZE);
            if samples == 0 {
                return Ok(());
            }
            let planes: Vec<&[u8]> = self.scratch.iter().map(|p| &p[..]).collect();
            self.dumper.dump(Some(&planes[..]), samples)?;
        }
    }

    fn dump_chunked(&mut self, planes: &[&[u8]], samples: usize) -> Result<()> {
        let stride = self.spec.plane_stride();
        let mut offset = 0;
        while offset < samples {
            let n = (samples - offset).min(MAX_FRAME_SIZE);
            let chunk: Vec<&[u8]> = planes
                .iter()
                .map(|p| &p[offset * stride..(offset + n) * stride])
                .collect();
            self.dumper.dump(Some(&chunk[..]), n)?;
            offset += n;
        }
        Ok(())
    }
}

fn frame_matches(frame: &ffmpeg::util::frame::Audio, spec: &SampleSpec) -> bool {
    SampleSpec::of_frame(frame).as_ref() == Some(spec)
}

fn feed_frames(
    feeder: &mut Feeder,
    frames: Vec<ffmpeg::util::frame::Audio>,
    summary: &mut RunSummary,
) -> Result<()> {
    for frame in frames {
        if !frame_matches(&frame, &feeder.spec) {
            tracing::warn!(
                format = ?frame.format(),
                rate = frame.rate(),
                channels = helpers::frame_channels(&frame),
                "Decoded frame does not match the stream layout, dropping it"
            );
            summary.decode_errors += 1;
            continue;
        }
        let samples = frame.samples();
        let planes = helpers::audio_planes(&frame);
        if planes.len() < feeder.spec.planes() || planes[0].len() < feeder.spec.plane_bytes(samples)
        {
            tracing::warn!(samples, "Decoded frame has no usable data, dropping it");
            summary.decode_errors += 1;
            continue;
        }
        summary.samples_decoded += samples as u64;
        feeder.push(&planes, samples)?;
    }
    Ok(())
}

/// Convert the capture named in `config` into its output file.
///
/// Everything is opened before the first record is read, so a bad codec
/// name or output path fails before any work is done. A capture that ends
/// in a damaged record is treated as complete up to that record.
pub fn run(config: &AppConfig) -> Result<RunSummary> {
    config.validate()?;

    let mut reader = RecordReader::open(&config.input)?;
    let mut decoder = PayloadDecoder::open(
        &config.decoder.codec,
        config.decoder.sample_rate,
        config.decoder.channels,
    )?;
    let spec = decoder.output_spec().ok_or_else(|| {
        AppError::Config(ConfigError::Invalid {
            field: "decoder.channels",
            reason: format!("{} channels has no channel layout", config.decoder.channels),
        })
    })?;

    let stretcher: Option<Box<dyn TimeStretcher>> = match config.stretch.active_tempo() {
        Some(tempo) => Some(Box::new(AtempoStretcher::new(spec.clone(), tempo)?)),
        None => None,
    };

    let options = DumperOptions {
        sample_rate: config.encoder.sample_rate,
        bit_rate: config.encoder.bit_rate,
    };
    let dumper = AudioDumper::open(&config.output, spec.clone(), &options)?;
    let mut feeder = Feeder::new(dumper, stretcher, spec);

    tracing::info!(
        input = %config.input.display(),
        output = %config.output.display(),
        codec = decoder.codec_name(),
        "Remuxing capture"
    );

    let mut summary = RunSummary::default();
    let mut sequence = SequenceTracker::new();
    let mut buf = vec![0u8; config.reader.buffer_size];

    loop {
        let record = match reader.read(&mut buf) {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(RecordError::BufferTooSmall { declared, .. }) => {
                // The cursor did not move; retry the same record
                tracing::debug!(from = buf.len(), to = declared, "Growing read buffer");
                buf.resize(declared, 0);
                continue;
            }
            Err(e) if e.is_truncation() => {
                tracing::warn!(error = %e, "Capture is truncated, stopping at the damaged record");
                summary.truncated = true;
                break;
            }
            Err(e) => return Err(e.into()),
        };

        summary.records += 1;
        summary.payload_bytes += record.payload.len() as u64;
        summary
            .first_capture_timestamp
            .get_or_insert(record.capture_timestamp);
        summary.last_capture_timestamp = Some(record.capture_timestamp);

        tracing::debug!(
            marker = record.marker,
            seq = record.sequence,
            rtp_ts = record.rtp_timestamp,
            cap_ts = record.capture_timestamp,
            cap_time = ?record.capture_time(),
            len = record.len(),
            "Record"
        );

        match sequence.observe(record.sequence) {
            SequenceEvent::Gap { missing } => {
                tracing::warn!(seq = record.sequence, missing, "Sequence gap");
            }
            SequenceEvent::Reordered => {
                tracing::warn!(seq = record.sequence, "Record arrived out of order");
            }
            SequenceEvent::Duplicate => {
                tracing::debug!(seq = record.sequence, "Duplicate sequence number");
            }
            SequenceEvent::First | SequenceEvent::InOrder => {}
        }

        match decoder.decode(record.payload) {
            Ok(frames) => feed_frames(&mut feeder, frames, &mut summary)?,
            Err(e) => {
                tracing::warn!(seq = record.sequence, error = %e, "Skipping undecodable payload");
                summary.decode_errors += 1;
            }
        }
    }

    match decoder.flush() {
        Ok(frames) => feed_frames(&mut feeder, frames, &mut summary)?,
        Err(e) => {
            tracing::warn!(error = %e, "Decoder flush failed");
            summary.decode_errors += 1;
        }
    }
    feeder.finish()?;
    feeder.dumper.close()?;

    summary.sequence_gaps = sequence.gaps();
    summary.missing_records = sequence.missing();
    summary.reordered_records = sequence.reordered();
    summary.samples_written = feeder.dumper.samples_written();
    summary.frames = feeder.dumper.frames_sent();
    summary.packets = feeder.dumper.packets_written();

    tracing::info!(
        records = summary.records,
        decode_errors = summary.decode_errors,
        gaps = summary.sequence_gaps,
        samples = summary.samples_written,
        packets = summary.packets,
        truncated = summary.truncated,
        "Remux complete"
    );

    Ok(summary)
}

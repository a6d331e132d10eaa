//! Encode-and-mux output stage
//!
//! `AudioDumper` accepts PCM in whatever chunk sizes the decoder produces and
//! turns it into a finished container file. The muxer is picked from the
//! output file extension and the encoder from the muxer's default audio
//! codec, so `out.wav` yields PCM and `out.m4a` yields AAC.
//!
//! Two regimes, fixed at construction:
//!
//! - FIFO regime: the encoder wants fixed-size frames, or a sample format or
//!   rate different from the input. Input goes through the resampler (if
//!   needed) into a FIFO, and whole frames are drained out of it. At end of
//!   stream the last partial frame is sent too.
//! - Passthrough regime: the encoder takes any frame size in the input's
//!   format and rate. Each chunk is copied into the frame and sent as is.
//!
//! Every frame is stamped with the running sample count, so pts is exact and
//! gapless whatever the chunking was.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;

use crate::audio::resampler::needs_resampling;
use crate::audio::{SampleFifo, SampleResampler, SampleSpec};
use crate::error::{DumpError, DumperInitError, Phase};
use crate::ffmpeg_utils::{helpers, io};

/// Largest chunk `dump` accepts, and the frame size used for encoders that
/// take variable-size frames.
pub const MAX_FRAME_SIZE: usize = 16384;

/// Lifecycle of an [`AudioDumper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumperState {
    /// Resources are being acquired; no header yet
    Constructing,
    /// Header written, accepting samples
    Streaming,
    /// End of stream seen, encoder drained; only `close` remains
    Flushed,
    /// Trailer written (if there was a header) and everything released
    Closed,
}

/// Output knobs beyond what the muxer decides
#[derive(Debug, Clone, Default)]
pub struct DumperOptions {
    /// Encode at this rate instead of the input rate
    pub sample_rate: Option<u32>,
    /// Encoder bit rate; the encoder default when unset
    pub bit_rate: Option<usize>,
}

/// What one `dump` call pushed through the encoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOutcome {
    pub frames_sent: u64,
    pub packets_written: u64,
}

/// PCM sink that encodes into a container file.
///
/// Resources are held in `Option`s and released in a fixed order by
/// [`close`](AudioDumper::close), which `Drop` also runs.
pub struct AudioDumper {
    path: PathBuf,
    state: DumperState,
    input: SampleSpec,

    output: Option<ffmpeg::format::context::Output>,
    encoder: Option<ffmpeg::encoder::Audio>,
    frame: Option<ffmpeg::util::frame::Audio>,
    packet: Option<ffmpeg::Packet>,
    resampler: Option<SampleResampler>,
    fifo: Option<SampleFifo>,

    file_opened: bool,
    need_trailer: bool,

    encoder_format: Option<ffmpeg::util::format::sample::Sample>,
    variable_frame_size: bool,
    frame_size: usize,
    stream_index: usize,
    codec_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,

    samples_written: u64,
    frames_sent: u64,
    packets_written: u64,

    #[cfg(test)]
    frame_log: Vec<(i64, usize)>,
}

impl AudioDumper {
    /// Create the output file at `path` for PCM described by `input`.
    ///
    /// On failure everything acquired so far is released and no file is
    /// left half-written: the file is only opened once every other step has
    /// succeeded.
    pub fn open(
        path: impl AsRef<Path>,
        input: SampleSpec,
        options: &DumperOptions,
    ) -> Result<Self, DumperInitError> {
        let mut dumper = Self {
            path: path.as_ref().to_path_buf(),
            state: DumperState::Constructing,
            input,
            output: None,
            encoder: None,
            frame: None,
            packet: None,
            resampler: None,
            fifo: None,
            file_opened: false,
            need_trailer: false,
            encoder_format: None,
            variable_frame_size: false,
            frame_size: 0,
            stream_index: 0,
            codec_time_base: ffmpeg::Rational::new(1, 1),
            stream_time_base: ffmpeg::Rational::new(1, 1),
            samples_written: 0,
            frames_sent: 0,
            packets_written: 0,
            #[cfg(test)]
            frame_log: Vec::new(),
        };

        if let Err(e) = dumper.construct(options) {
            tracing::warn!(path = %dumper.path.display(), error = %e, "Failed to open output");
            dumper.release();
            return Err(e);
        }
        Ok(dumper)
    }

    fn construct(&mut self, options: &DumperOptions) -> Result<(), DumperInitError> {
        let display = self.path.display().to_string();
        let c_path = io::path_to_cstring(&self.path)
            .ok_or_else(|| DumperInitError::InvalidPath(display.clone()))?;

        // 1. Output context, muxer chosen by extension
        let output = io::alloc_output(&c_path).map_err(|source| DumperInitError::OutputFormat {
            path: display.clone(),
            source,
        })?;
        let muxer_name = output.format().name().to_string();
        let codec_id = helpers::output_audio_codec(&output);
        let global_header = io::wants_global_header(&output);
        let file_less = io::is_file_less(&output);
        let output = self.output.insert(output);

        // 2. Encoder for the muxer's audio codec
        if codec_id == ffmpeg::codec::Id::None {
            return Err(DumperInitError::NoAudioCodec(muxer_name));
        }
        let codec = ffmpeg::encoder::find(codec_id)
            .ok_or_else(|| DumperInitError::EncoderNotFound(codec_id.name().to_string()))?;
        self.variable_frame_size = codec
            .capabilities()
            .contains(ffmpeg::codec::capabilities::Capabilities::VARIABLE_FRAME_SIZE);

        // 3. Keep the input format when the encoder takes it
        let format = match helpers::supported_sample_formats(&codec) {
            Some(formats) if formats.contains(&self.input.format) => self.input.format,
            Some(formats) => formats.first().copied().unwrap_or(self.input.format),
            None => self.input.format,
        };
        let rate = options.sample_rate.unwrap_or(self.input.rate);
        let encoded = SampleSpec {
            format,
            layout: self.input.layout.clone(),
            channels: self.input.channels,
            rate,
        };

        // 4. Configure and open the encoder
        let time_base = ffmpeg::Rational::new(1, rate as i32);
        let context = ffmpeg::codec::Context::new_with_codec(codec);
        let mut audio_enc = context
            .encoder()
            .audio()
            .map_err(DumperInitError::EncoderOpen)?;
        audio_enc.set_rate(rate as i32);
        audio_enc.set_format(format);
        audio_enc.set_channel_layout(encoded.layout.clone());
        audio_enc.set_time_base(time_base);
        if let Some(bit_rate) = options.bit_rate {
            audio_enc.set_bit_rate(bit_rate);
        }
        if global_header {
            audio_enc.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let encoder = audio_enc
            .open_as(codec)
            .map_err(DumperInitError::EncoderOpen)?;

        // 5. Stream
        let mut stream = output.add_stream(codec).map_err(DumperInitError::Stream)?;
        stream.set_time_base(time_base);
        stream.set_parameters(helpers::encoder_codec_parameters(&encoder));
        self.stream_index = stream.index();
        self.codec_time_base = time_base;

        let fixed_size = encoder.frame_size() as usize;
        self.encoder = Some(encoder);
        self.encoder_format = Some(format);

        // 6. Reusable frame
        self.frame_size = if self.variable_frame_size {
            MAX_FRAME_SIZE
        } else if fixed_size == 0 {
            return Err(DumperInitError::FrameSize);
        } else {
            fixed_size
        };
        let mut frame =
            ffmpeg::util::frame::Audio::new(format, self.frame_size, encoded.layout.clone());
        if !helpers::frame_has_buffer(&frame) {
            return Err(DumperInitError::FrameAlloc(self.frame_size));
        }
        frame.set_rate(rate);
        self.frame = Some(frame);

        // 7. Reusable packet
        self.packet = Some(ffmpeg::Packet::empty());

        // 8. FIFO and resampler, only when the input can't go straight in
        if !self.variable_frame_size || format != self.input.format || rate != self.input.rate {
            self.fifo = Some(SampleFifo::new(encoded.clone(), MAX_FRAME_SIZE));
            if needs_resampling(&self.input, &encoded) {
                self.resampler = Some(SampleResampler::new(self.input.clone(), encoded.clone())?);
            }
        }

        // 9. The file itself
        if !file_less {
            let output = self
                .output
                .as_mut()
                .ok_or_else(|| DumperInitError::InvalidPath(display.clone()))?;
            io::open_output_file(output, &c_path).map_err(|source| {
                DumperInitError::FileOpen {
                    path: display.clone(),
                    source,
                }
            })?;
            self.file_opened = true;
        }

        // 10. Header
        let output = self
            .output
            .as_mut()
            .ok_or_else(|| DumperInitError::InvalidPath(display.clone()))?;
        output.write_header().map_err(DumperInitError::WriteHeader)?;
        self.need_trailer = true;
        self.stream_time_base = output
            .stream(self.stream_index)
            .map(|s| s.time_base())
            .unwrap_or(time_base);
        self.state = DumperState::Streaming;

        tracing::info!(
            path = %display,
            muxer = %muxer_name,
            codec = codec_id.name(),
            format = ?format,
            rate,
            channels = encoded.channels,
            frame_size = self.frame_size,
            fifo = self.fifo.is_some(),
            resampler = self.resampler.is_some(),
            "Opened output"
        );
        Ok(())
    }

    /// Feed `samples` samples of PCM; `None` marks end of stream.
    ///
    /// `Some` with zero samples is a no-op, not end of stream. After an
    /// error the dumper stays `Streaming` so the caller can still close it
    /// and get a trailer.
    pub fn dump(
        &mut self,
        pcm: Option<&[&[u8]]>,
        samples: usize,
    ) -> Result<DumpOutcome, DumpError> {
        if samples > MAX_FRAME_SIZE {
            return Err(DumpError::InvalidArgument(format!(
                "{} samples exceeds the {} sample limit",
                samples, MAX_FRAME_SIZE
            )));
        }
        if self.state != DumperState::Streaming {
            return Err(DumpError::NotStreaming(self.state));
        }
        if let Some(planes) = pcm {
            self.input
                .check_planes(planes, samples)
                .map_err(DumpError::InvalidArgument)?;
        }

        let frames_before = self.frames_sent;
        let packets_before = self.packets_written;

        if self.fifo.is_some() {
            self.dump_buffered(pcm, samples)?;
        } else {
            self.dump_direct(pcm, samples)?;
        }

        if pcm.is_none() {
            self.state = DumperState::Flushed;
            tracing::debug!(
                samples = self.samples_written,
                frames = self.frames_sent,
                packets = self.packets_written,
                "Output flushed"
            );
        }

        Ok(DumpOutcome {
            frames_sent: self.frames_sent - frames_before,
            packets_written: self.packets_written - packets_before,
        })
    }

    fn dump_buffered(&mut self, pcm: Option<&[&[u8]]>, samples: usize) -> Result<(), DumpError> {
        let fifo = self.fifo.as_mut().ok_or(DumpError::NotStreaming(self.state))?;

        match (self.resampler.as_mut(), pcm) {
            (Some(resampler), _) => {
                resampler.resample(fifo, pcm, samples)?;
            }
            (None, Some(planes)) => {
                let written = fifo.write(planes, samples);
                if written != samples {
                    return Err(DumpError::BufferWrite {
                        offered: samples,
                        written,
                    });
                }
            }
            (None, None) => {}
        }

        let min_frame = if self.variable_frame_size {
            1
        } else {
            self.frame_size
        };
        while self.fifo_size() >= min_frame {
            self.send_from_fifo(Phase::Framing)?;
        }

        if pcm.is_none() {
            while self.fifo_size() > 0 {
                self.send_from_fifo(Phase::Flush)?;
            }
            self.send_eof()?;
        }
        Ok(())
    }

    fn dump_direct(&mut self, pcm: Option<&[&[u8]]>, samples: usize) -> Result<(), DumpError> {
        let planes = match pcm {
            Some(planes) => planes,
            None => return self.send_eof(),
        };
        if samples == 0 {
            return Ok(());
        }

        let bytes = self.input.plane_bytes(samples);
        let frame = self.prepare_frame(Phase::Passthrough)?;
        for (dst, src) in helpers::audio_planes_mut(frame).into_iter().zip(planes) {
            dst[..bytes].copy_from_slice(&src[..bytes]);
        }
        self.send_frame(samples, Phase::Passthrough)
    }

    fn fifo_size(&self) -> usize {
        self.fifo.as_ref().map_or(0, |f| f.size())
    }

    /// Restore the frame to full capacity and make sure the encoder no
    /// longer shares its buffers.
    fn prepare_frame(
        &mut self,
        phase: Phase,
    ) -> Result<&mut ffmpeg::util::frame::Audio, DumpError> {
        let state = self.state;
        let frame = self.frame.as_mut().ok_or(DumpError::NotStreaming(state))?;
        frame.set_samples(self.frame_size);
        helpers::make_writable(frame)
            .map_err(|source| DumpError::FrameNotWritable { phase, source })?;
        Ok(frame)
    }

    fn send_from_fifo(&mut self, phase: Phase) -> Result<(), DumpError> {
        let wanted = self.frame_size.min(self.fifo_size());
        self.prepare_frame(phase)?;

        let state = self.state;
        let (Some(fifo), Some(frame)) = (self.fifo.as_mut(), self.frame.as_mut()) else {
            return Err(DumpError::NotStreaming(state));
        };
        let mut planes = helpers::audio_planes_mut(frame);
        let got = fifo.read(&mut planes, wanted);
        if got != wanted {
            return Err(DumpError::FifoRead { phase, wanted, got });
        }
        self.send_frame(got, phase)
    }

    /// Stamp the frame with the running sample count and hand it to the
    /// encoder.
    fn send_frame(&mut self, samples: usize, phase: Phase) -> Result<(), DumpError> {
        let state = self.state;
        let (Some(encoder), Some(frame)) = (self.encoder.as_mut(), self.frame.as_mut()) else {
            return Err(DumpError::NotStreaming(state));
        };

        let pts = self.samples_written as i64;
        frame.set_samples(samples);
        frame.set_pts(Some(pts));
        encoder
            .send_frame(frame)
            .map_err(|source| DumpError::SendFrame { phase, source })?;

        self.samples_written += samples as u64;
        self.frames_sent += 1;
        #[cfg(test)]
        self.frame_log.push((pts, samples));

        self.drain_packets(phase)
    }

    fn send_eof(&mut self) -> Result<(), DumpError> {
        let state = self.state;
        let encoder = self.encoder.as_mut().ok_or(DumpError::NotStreaming(state))?;
        encoder.send_eof().map_err(|source| DumpError::SendFrame {
            phase: Phase::Flush,
            source,
        })?;
        self.drain_packets(Phase::Flush)
    }

    /// Write every packet the encoder has ready.
    fn drain_packets(&mut self, phase: Phase) -> Result<(), DumpError> {
        let state = self.state;
        let (Some(encoder), Some(packet), Some(output)) = (
            self.encoder.as_mut(),
            self.packet.as_mut(),
            self.output.as_mut(),
        ) else {
            return Err(DumpError::NotStreaming(state));
        };

        loop {
            match encoder.receive_packet(packet) {
                Ok(()) => {}
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => break,
                Err(ffmpeg::Error::Eof) => break,
                Err(source) => return Err(DumpError::ReceivePacket { phase, source }),
            }

            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.codec_time_base, self.stream_time_base);
            packet
                .write_interleaved(output)
                .map_err(|source| DumpError::WritePacket { phase, source })?;
            self.packets_written += 1;
        }
        Ok(())
    }

    /// Write the trailer (once, and only after a header) and release
    /// everything. Safe to call repeatedly; later calls do nothing.
    pub fn close(&mut self) -> Result<(), DumpError> {
        if self.state == DumperState::Closed {
            return Ok(());
        }
        let result = self.write_trailer();
        self.release();
        tracing::debug!(
            path = %self.path.display(),
            samples = self.samples_written,
            packets = self.packets_written,
            "Output closed"
        );
        result
    }

    fn write_trailer(&mut self) -> Result<(), DumpError> {
        if !self.need_trailer {
            return Ok(());
        }
        self.need_trailer = false;
        match self.output.as_mut() {
            Some(output) => output.write_trailer().map_err(DumpError::WriteTrailer),
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        self.encoder = None;
        self.frame = None;
        self.packet = None;
        if let Some(mut resampler) = self.resampler.take() {
            resampler.close();
        }
        self.fifo = None;
        if let Some(output) = self.output.as_mut() {
            if self.file_opened {
                io::close_output_file(output);
                self.file_opened = false;
            }
        }
        self.output = None;
        self.state = DumperState::Closed;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> DumperState {
        self.state
    }

    /// Samples submitted to the encoder so far; also the next frame's pts.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Samples per encoder frame, or `MAX_FRAME_SIZE` for variable-size
    /// encoders.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn has_fifo(&self) -> bool {
        self.fifo.is_some()
    }

    pub fn has_resampler(&self) -> bool {
        self.resampler
            .as_ref()
            .is_some_and(|r| r.is_initialized())
    }

    pub fn encoder_format(&self) -> Option<ffmpeg::util::format::sample::Sample> {
        self.encoder_format
    }

    #[cfg(test)]
    pub(crate) fn frame_log(&self) -> &[(i64, usize)] {
        &self.frame_log
    }
}

impl Drop for AudioDumper {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to finalize output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::decoded_samples;
    use ffmpeg_next::util::format::sample::{Sample, Type};

    fn s16_mono() -> SampleSpec {
        SampleSpec::new(Sample::I16(Type::Packed), 1, 16000).unwrap()
    }

    fn ramp(start: usize, samples: usize) -> Vec<u8> {
        (start..start + samples)
            .map(|i| (i % 2000) as i16 - 1000)
            .flat_map(|s| s.to_ne_bytes())
            .collect()
    }

    fn assert_gapless(log: &[(i64, usize)]) {
        let mut expected = 0i64;
        for &(pts, samples) in log {
            assert_eq!(pts, expected);
            expected += samples as i64;
        }
    }

    #[test]
    fn test_wav_passthrough() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut dumper = AudioDumper::open(&path, s16_mono(), &DumperOptions::default()).unwrap();
        assert_eq!(dumper.state(), DumperState::Streaming);
        assert!(!dumper.has_fifo());
        assert!(!dumper.has_resampler());
        assert_eq!(dumper.frame_size(), MAX_FRAME_SIZE);
        assert_eq!(dumper.encoder_format(), Some(Sample::I16(Type::Packed)));

        let mut offset = 0;
        for chunk in [320, 17, 1000, 320] {
            let pcm = ramp(offset, chunk);
            dumper.dump(Some(&[&pcm[..]]), chunk).unwrap();
            offset += chunk;
        }
        dumper.dump(None, 0).unwrap();
        assert_eq!(dumper.state(), DumperState::Flushed);
        assert_eq!(dumper.samples_written(), offset as u64);
        assert_eq!(dumper.frames_sent(), 4);
        assert_gapless(dumper.frame_log());

        dumper.close().unwrap();
        assert_eq!(dumper.state(), DumperState::Closed);
        assert_eq!(decoded_samples(&path), offset);
    }

    #[test]
    fn test_m4a_fixed_frames_conserve_samples() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.m4a");

        let mut dumper = AudioDumper::open(&path, s16_mono(), &DumperOptions::default()).unwrap();
        assert!(dumper.has_fifo());
        assert!(dumper.has_resampler());
        assert_eq!(dumper.frame_size(), 1024);
        assert_eq!(dumper.encoder_format(), Some(Sample::F32(Type::Planar)));

        // 10 x 320 = 3200 samples: three full frames plus a 128-sample tail
        for i in 0..10 {
            let pcm = ramp(i * 320, 320);
            dumper.dump(Some(&[&pcm[..]]), 320).unwrap();
        }
        assert_eq!(dumper.frames_sent(), 3);

        dumper.dump(None, 0).unwrap();
        let log = dumper.frame_log().to_vec();
        assert_gapless(&log);
        assert!(log[..log.len() - 1].iter().all(|&(_, n)| n == 1024));
        assert_eq!(dumper.samples_written(), 3200);
        assert!(dumper.packets_written() > 0);

        dumper.close().unwrap();
        assert!(ffmpeg::format::input(&path).is_ok());
    }

    #[test]
    fn test_output_rate_forces_resampling() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let options = DumperOptions {
            sample_rate: Some(48000),
            bit_rate: None,
        };

        let mut dumper = AudioDumper::open(&path, s16_mono(), &options).unwrap();
        assert!(dumper.has_fifo());
        assert!(dumper.has_resampler());

        for i in 0..50 {
            let pcm = ramp(i * 320, 320);
            dumper.dump(Some(&[&pcm[..]]), 320).unwrap();
        }
        dumper.dump(None, 0).unwrap();
        assert_gapless(dumper.frame_log());

        let written = dumper.samples_written() as i64;
        assert!((written - 48000).abs() <= 96, "got {} samples", written);
        dumper.close().unwrap();
    }

    #[test]
    fn test_unknown_extension_fails_before_any_file() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.not-a-container");

        let result = AudioDumper::open(&path, s16_mono(), &DumperOptions::default());
        assert!(matches!(result, Err(DumperInitError::OutputFormat { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_directory_fails_at_file_open() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");

        let result = AudioDumper::open(&path, s16_mono(), &DumperOptions::default());
        assert!(matches!(result, Err(DumperInitError::FileOpen { .. })));
    }

    #[test]
    fn test_invalid_dump_keeps_streaming_and_drop_finalizes() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.m4a");

        {
            let mut dumper =
                AudioDumper::open(&path, s16_mono(), &DumperOptions::default()).unwrap();
            let pcm = ramp(0, 2048);
            dumper.dump(Some(&[&pcm[..]]), 2048).unwrap();

            let big = vec![0u8; (MAX_FRAME_SIZE + 1) * 2];
            assert!(matches!(
                dumper.dump(Some(&[&big[..]]), MAX_FRAME_SIZE + 1),
                Err(DumpError::InvalidArgument(_))
            ));
            assert!(matches!(
                dumper.dump(Some(&[&pcm[..10]]), 100),
                Err(DumpError::InvalidArgument(_))
            ));
            assert_eq!(dumper.state(), DumperState::Streaming);
        }

        // Drop wrote the trailer, so the moov atom is there
        assert!(ffmpeg::format::input(&path).is_ok());
    }

    #[test]
    fn test_dump_after_flush_is_rejected() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut dumper = AudioDumper::open(&path, s16_mono(), &DumperOptions::default()).unwrap();
        dumper.dump(None, 0).unwrap();
        let pcm = ramp(0, 10);
        assert!(matches!(
            dumper.dump(Some(&[&pcm[..]]), 10),
            Err(DumpError::NotStreaming(DumperState::Flushed))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        ffmpeg::init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut dumper = AudioDumper::open(&path, s16_mono(), &DumperOptions::default()).unwrap();
        let pcm = ramp(0, 160);
        dumper.dump(Some(&[&pcm[..]]), 160).unwrap();
        dumper.dump(None, 0).unwrap();

        dumper.close().unwrap();
        dumper.close().unwrap();
        assert_eq!(dumper.state(), DumperState::Closed);
        assert!(matches!(
            dumper.dump(None, 0),
            Err(DumpError::NotStreaming(DumperState::Closed))
        ));
        assert_eq!(decoded_samples(&path), 160);
    }
}

//! Payload decoder
//!
//! Captured records carry bare codec payloads (an Opus packet per record for
//! the usual capture) with no container around them, so the decoder is
//! configured from the command line rather than from stream parameters.

use ffmpeg_next as ffmpeg;

use crate::audio::SampleSpec;
use crate::error::DecodeError;
use crate::ffmpeg_utils::helpers;

/// Default payload codec for captures.
pub const DEFAULT_CODEC: &str = "opus";

/// Decoder for one stream of raw payloads
pub struct PayloadDecoder {
    decoder: ffmpeg::decoder::Audio,
    codec_name: String,
    channels: u16,
}

impl PayloadDecoder {
    /// Open the FFmpeg decoder named `codec_name` for `channels` channels at
    /// `sample_rate`.
    pub fn open(codec_name: &str, sample_rate: u32, channels: u16) -> Result<Self, DecodeError> {
        let codec = ffmpeg::decoder::find_by_name(codec_name)
            .filter(|c| c.medium() == ffmpeg::media::Type::Audio)
            .ok_or_else(|| DecodeError::NotFound(codec_name.to_string()))?;

        let mut context = ffmpeg::codec::Context::new_with_codec(codec);
        helpers::set_audio_params(&mut context, sample_rate, channels);

        let decoder = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.audio())
            .map_err(|source| DecodeError::Open {
                codec: codec_name.to_string(),
                source,
            })?;

        tracing::debug!(
            codec = codec_name,
            sample_rate,
            channels,
            format = ?decoder.format(),
            "Opened payload decoder"
        );

        Ok(Self {
            decoder,
            codec_name: codec_name.to_string(),
            channels,
        })
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    /// PCM layout of decoded frames, as reported by the opened decoder.
    pub fn output_spec(&self) -> Option<SampleSpec> {
        SampleSpec::new(self.decoder.format(), self.channels, self.decoder.rate())
    }

    /// Decode one payload and return every frame it produced.
    ///
    /// An empty payload yields nothing: an empty packet would put the decoder
    /// into draining mode.
    pub fn decode(
        &mut self,
        payload: &[u8],
    ) -> Result<Vec<ffmpeg::util::frame::Audio>, DecodeError> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        let packet = ffmpeg::Packet::copy(payload);
        self.decoder
            .send_packet(&packet)
            .map_err(DecodeError::Decode)?;
        self.receive_frames()
    }

    /// Signal end of stream and return the frames the decoder still held.
    pub fn flush(&mut self) -> Result<Vec<ffmpeg::util::frame::Audio>, DecodeError> {
        match self.decoder.send_eof() {
            Ok(()) => {}
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {}
            Err(ffmpeg::Error::Eof) => {}
            Err(e) => return Err(DecodeError::Decode(e)),
        }
        self.receive_frames()
    }

    fn receive_frames(&mut self) -> Result<Vec<ffmpeg::util::frame::Audio>, DecodeError> {
        let mut frames = Vec::new();
        loop {
            let mut frame = ffmpeg::util::frame::Audio::empty();
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => frames.push(frame),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => break,
                Err(ffmpeg::Error::Eof) => break,
                Err(e) => return Err(DecodeError::Decode(e)),
            }
        }
        Ok(frames)
    }
}

//! PCM plumbing between the decoder and the encoder
//!
//! - `SampleSpec`: format / layout / rate of a PCM stream
//! - `SampleFifo`: elastic sample queue that re-chunks arbitrary input
//! - `ScratchBuffer`: grow-only conversion buffer
//! - `SampleResampler`: libswresample format and rate conversion

pub mod fifo;
pub mod resampler;
pub mod scratch;

pub use fifo::SampleFifo;
pub use resampler::SampleResampler;
pub use scratch::ScratchBuffer;

use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::Sample;
use ffmpeg_next::util::frame;

use crate::ffmpeg_utils::helpers;

/// Channel layout for a channel count; only mono and stereo captures exist.
pub fn layout_for_channels(channels: u16) -> Option<ChannelLayout> {
    match channels {
        1 => Some(ChannelLayout::MONO),
        2 => Some(ChannelLayout::STEREO),
        _ => None,
    }
}

/// Describes one PCM stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
    pub format: Sample,
    pub layout: ChannelLayout,
    pub channels: u16,
    pub rate: u32,
}

impl SampleSpec {
    /// Build a spec for a mono or stereo stream.
    pub fn new(format: Sample, channels: u16, rate: u32) -> Option<Self> {
        Some(Self {
            format,
            layout: layout_for_channels(channels)?,
            channels,
            rate,
        })
    }

    /// Spec of a decoded frame, if it is mono or stereo.
    pub fn of_frame(frame: &frame::Audio) -> Option<Self> {
        Self::new(frame.format(), helpers::frame_channels(frame), frame.rate())
    }

    /// Number of data planes: one per channel if planar, else one.
    pub fn planes(&self) -> usize {
        if self.format.is_planar() {
            self.channels as usize
        } else {
            1
        }
    }

    /// Bytes one sample occupies within a single plane.
    pub fn plane_stride(&self) -> usize {
        if self.format.is_planar() {
            self.format.bytes()
        } else {
            self.format.bytes() * self.channels as usize
        }
    }

    /// Bytes needed in each plane to hold `samples` samples.
    pub fn plane_bytes(&self, samples: usize) -> usize {
        samples * self.plane_stride()
    }

    /// Check that `planes` can supply `samples` samples of this spec.
    pub fn check_planes(&self, planes: &[&[u8]], samples: usize) -> Result<(), String> {
        if planes.len() < self.planes() {
            return Err(format!(
                "expected {} planes, got {}",
                self.planes(),
                planes.len()
            ));
        }
        let need = self.plane_bytes(samples);
        if let Some((index, plane)) = planes
            .iter()
            .take(self.planes())
            .enumerate()
            .find(|(_, p)| p.len() < need)
        {
            return Err(format!(
                "plane {} holds {} bytes, {} samples need {}",
                index,
                plane.len(),
                samples,
                need
            ));
        }
        Ok(())
    }
}

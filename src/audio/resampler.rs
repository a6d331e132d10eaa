//! Sample format / rate converter feeding a [`SampleFifo`]
//!
//! Wraps FFmpeg's `SwrContext`. Converted samples land in a grow-only
//! scratch buffer and are then appended to the caller's FIFO, so the caller
//! never sees the scratch storage.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::software::resampling;

use super::{SampleFifo, SampleSpec, ScratchBuffer};
use crate::error::ResampleError;
use crate::ffmpeg_utils::helpers;

struct Live {
    context: resampling::Context,
    input: SampleSpec,
    scratch: ScratchBuffer,
}

/// Stateful converter from one [`SampleSpec`] to another.
///
/// A default or closed resampler is inert: every call reports
/// [`ResampleError::NotInitialized`].
#[derive(Default)]
pub struct SampleResampler {
    live: Option<Live>,
}

impl SampleResampler {
    /// Create a converter from `input` to `output`.
    pub fn new(input: SampleSpec, output: SampleSpec) -> Result<Self, ResampleError> {
        let context = resampling::Context::get(
            input.format,
            input.layout.clone(),
            input.rate,
            output.format,
            output.layout.clone(),
            output.rate,
        )
        .map_err(ResampleError::Init)?;

        tracing::debug!(
            in_format = ?input.format,
            in_rate = input.rate,
            out_format = ?output.format,
            out_rate = output.rate,
            channels = output.channels,
            "Created resampler"
        );

        Ok(Self {
            live: Some(Live {
                context,
                input,
                scratch: ScratchBuffer::new(output),
            }),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.live.is_some()
    }

    /// Release the conversion context and scratch buffer.
    pub fn close(&mut self) {
        self.live = None;
    }

    /// Current scratch capacity in samples; 0 when inert or not yet used.
    pub fn scratch_capacity(&self) -> usize {
        self.live.as_ref().map_or(0, |l| l.scratch.capacity())
    }

    /// Convert `samples` input samples and append the result to `sink`.
    ///
    /// `input == None` drains samples the converter is still holding.
    /// Returns the number of samples appended, which may be 0 while the
    /// converter primes its filter.
    pub fn resample(
        &mut self,
        sink: &mut SampleFifo,
        input: Option<&[&[u8]]>,
        samples: usize,
    ) -> Result<usize, ResampleError> {
        let live = self.live.as_mut().ok_or(ResampleError::NotInitialized)?;

        if samples > i32::MAX as usize {
            return Err(ResampleError::InvalidArgument(format!(
                "{} samples exceeds the converter's range",
                samples
            )));
        }
        if sink.spec() != live.scratch.spec() {
            return Err(ResampleError::InvalidArgument(format!(
                "sink holds {:?}, converter produces {:?}",
                sink.spec(),
                live.scratch.spec()
            )));
        }

        let in_ptrs: Vec<*const u8> = match input {
            Some(planes) => {
                live.input
                    .check_planes(planes, samples)
                    .map_err(ResampleError::InvalidArgument)?;
                planes
                    .iter()
                    .take(live.input.planes())
                    .map(|p| p.as_ptr())
                    .collect()
            }
            None => Vec::new(),
        };
        let in_count = if input.is_some() { samples } else { 0 };

        // SAFETY: the context pointer is valid while `live` is borrowed; no
        // reference into the context is held across the FFI calls below.
        let swr = unsafe { live.context.as_mut_ptr() };

        // SAFETY: `swr` is an initialised SwrContext.
        let max_samples =
            unsafe { ffmpeg::ffi::swr_get_out_samples(swr, in_count as std::ffi::c_int) };
        if max_samples < 0 {
            return Err(ResampleError::CapacityQuery {
                samples: in_count,
                code: max_samples,
            });
        }
        if max_samples == 0 {
            return Ok(0);
        }

        let frame = live
            .scratch
            .reserve(max_samples as usize)
            .ok_or(ResampleError::Allocation {
                samples: max_samples as usize,
            })?;

        let mut out_ptrs: Vec<*mut u8> = helpers::audio_planes_mut(frame)
            .into_iter()
            .map(|p| p.as_mut_ptr())
            .collect();
        let in_ptr = if input.is_some() {
            in_ptrs.as_ptr()
        } else {
            std::ptr::null()
        };

        // SAFETY: every output plane holds at least `max_samples` samples of
        // the output format (scratch capacity); every input plane holds
        // `in_count` samples of the input format (checked above).  A null
        // input asks the converter to flush.
        let produced = unsafe {
            ffmpeg::ffi::swr_convert(
                swr,
                out_ptrs.as_mut_ptr(),
                max_samples,
                in_ptr,
                in_count as std::ffi::c_int,
            )
        };
        if produced < 0 {
            return Err(ResampleError::Conversion(ffmpeg::Error::from(produced)));
        }

        let produced = produced as usize;
        if produced > 0 {
            let planes = helpers::audio_planes(frame);
            let written = sink.write(&planes, produced);
            if written != produced {
                return Err(ResampleError::SinkWrite { produced, written });
            }
        }

        Ok(produced)
    }

    /// Drain whatever the converter still holds into `sink`.
    pub fn flush(&mut self, sink: &mut SampleFifo) -> Result<usize, ResampleError> {
        self.resample(sink, None, 0)
    }
}

/// Whether converting from `input` to `output` needs a resampler at all.
pub fn needs_resampling(input: &SampleSpec, output: &SampleSpec) -> bool {
    input.format != output.format || input.rate != output.rate || input.layout != output.layout
}

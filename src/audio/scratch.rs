//! Grow-only sample buffer
//!
//! Conversion output sizes vary call to call by a few samples. Reallocating
//! on every change would churn the allocator, so the buffer keeps its
//! largest allocation and only replaces it when a request exceeds it.

use ffmpeg_next as ffmpeg;

use super::SampleSpec;
use crate::ffmpeg_utils::helpers;

/// FFmpeg-allocated planar buffer whose capacity never shrinks.
///
/// Invariant: `capacity() > 0` iff a frame with storage for at least
/// `capacity()` samples per plane is held.
pub struct ScratchBuffer {
    spec: SampleSpec,
    frame: Option<ffmpeg::util::frame::Audio>,
    capacity: usize,
}

impl ScratchBuffer {
    /// Create an empty buffer; nothing is allocated until [`reserve`].
    ///
    /// [`reserve`]: ScratchBuffer::reserve
    pub fn new(spec: SampleSpec) -> Self {
        Self {
            spec,
            frame: None,
            capacity: 0,
        }
    }

    pub fn spec(&self) -> &SampleSpec {
        &self.spec
    }

    /// Samples per plane the current allocation holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Make room for at least `samples` samples and return the frame.
    ///
    /// The old allocation is released before the new one is made; if that
    /// allocation fails the buffer is left empty (capacity 0) and a later
    /// call simply tries again. Returns `None` on allocation failure.
    pub fn reserve(&mut self, samples: usize) -> Option<&mut ffmpeg::util::frame::Audio> {
        let samples = samples.max(1);

        if self.frame.is_none() || samples > self.capacity {
            let previous = self.capacity;
            self.frame = None;
            self.capacity = 0;

            let mut frame =
                ffmpeg::util::frame::Audio::new(self.spec.format, samples, self.spec.layout.clone());
            if !helpers::frame_has_buffer(&frame) {
                tracing::warn!(samples, "Scratch buffer allocation failed");
                return None;
            }
            frame.set_rate(self.spec.rate);

            tracing::trace!(
                from = previous,
                to = samples,
                "Scratch buffer grown"
            );
            self.frame = Some(frame);
            self.capacity = samples;
        }

        self.frame.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::util::format::sample::{Sample, Type};

    fn spec() -> SampleSpec {
        SampleSpec::new(Sample::F32(Type::Planar), 2, 48000).unwrap()
    }

    #[test]
    fn test_starts_empty() {
        let mut scratch = ScratchBuffer::new(spec());
        assert_eq!(scratch.capacity(), 0);
    }

    #[test]
    fn test_capacity_only_grows() {
        let mut scratch = ScratchBuffer::new(spec());

        assert!(scratch.reserve(480).is_some());
        assert_eq!(scratch.capacity(), 480);

        assert!(scratch.reserve(100).is_some());
        assert_eq!(scratch.capacity(), 480);

        assert!(scratch.reserve(1024).is_some());
        assert_eq!(scratch.capacity(), 1024);

        assert!(scratch.reserve(1024).is_some());
        assert_eq!(scratch.capacity(), 1024);
    }

    #[test]
    fn test_frame_planes_fit_capacity() {
        let mut scratch = ScratchBuffer::new(spec());
        let frame = scratch.reserve(960).unwrap();
        let planes = helpers::audio_planes_mut(frame);
        assert_eq!(planes.len(), 2);
        assert!(planes.iter().all(|p| p.len() >= 960 * 4));
    }
}

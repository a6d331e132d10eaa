//! Elastic sample queue

use std::collections::VecDeque;

use super::SampleSpec;

/// FIFO of samples in one [`SampleSpec`], kept as per-plane byte queues.
///
/// Writes append at the back, reads remove from the front, so samples are
/// never reordered and a partial frame left behind by one read is the head
/// of the next. Grows as needed; never drops samples.
#[derive(Debug)]
pub struct SampleFifo {
    spec: SampleSpec,
    planes: Vec<VecDeque<u8>>,
    stride: usize,
    size: usize,
}

impl SampleFifo {
    /// Create a FIFO with room for `capacity` samples before it reallocates.
    pub fn new(spec: SampleSpec, capacity: usize) -> Self {
        let stride = spec.plane_stride();
        let planes = (0..spec.planes())
            .map(|_| VecDeque::with_capacity(capacity * stride))
            .collect();
        Self {
            spec,
            planes,
            stride,
            size: 0,
        }
    }

    pub fn spec(&self) -> &SampleSpec {
        &self.spec
    }

    /// Buffered sample count.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Append up to `samples` samples from `input`.
    ///
    /// Returns the number of samples accepted, which is less than `samples`
    /// only if `input` is missing planes or a plane is too short.
    pub fn write(&mut self, input: &[&[u8]], samples: usize) -> usize {
        if input.len() < self.planes.len() {
            return 0;
        }
        let available = input
            .iter()
            .take(self.planes.len())
            .map(|p| p.len() / self.stride)
            .min()
            .unwrap_or(0);
        let n = samples.min(available);
        let bytes = n * self.stride;

        for (queue, plane) in self.planes.iter_mut().zip(input) {
            queue.extend(&plane[..bytes]);
        }
        self.size += n;
        n
    }

    /// Move up to `samples` samples from the front into `out`.
    ///
    /// Returns the number of samples moved: the smallest of `samples`, the
    /// buffered count and what the output planes can hold.
    pub fn read(&mut self, out: &mut [&mut [u8]], samples: usize) -> usize {
        if out.len() < self.planes.len() {
            return 0;
        }
        let room = out
            .iter()
            .take(self.planes.len())
            .map(|p| p.len() / self.stride)
            .min()
            .unwrap_or(0);
        let n = samples.min(self.size).min(room);
        let bytes = n * self.stride;

        for (queue, plane) in self.planes.iter_mut().zip(out.iter_mut()) {
            for (dst, src) in plane[..bytes].iter_mut().zip(queue.drain(..bytes)) {
                *dst = src;
            }
        }
        self.size -= n;
        n
    }
}

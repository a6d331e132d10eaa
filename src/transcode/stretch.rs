//! Tempo change without pitch change
//!
//! The [`TimeStretcher`] trait is the seam the pipeline drives;
//! [`AtempoStretcher`] implements it with FFmpeg's `atempo` filter:
//!
//! ```text
//! abuffer -> atempo=X,aformat=... -> abuffersink
//! ```
//!
//! `aformat` pins the sink to the input spec so stretched samples can go
//! straight to the output stage without another conversion.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::filter;

use crate::audio::{SampleFifo, SampleSpec};
use crate::error::StretchError;
use crate::ffmpeg_utils::helpers;

/// Tempo range the `atempo` filter accepts.
pub const MIN_TEMPO: f64 = 0.5;
pub const MAX_TEMPO: f64 = 100.0;

/// Time-stretch stage between decoder and output.
///
/// Samples go in through `process` and come out through `retrieve`; the
/// stretcher may hold samples back until it has enough context, so
/// `available` can lag behind what was submitted until the final call.
pub trait TimeStretcher {
    /// Submit `samples` samples. `is_final` marks the end of input and
    /// releases everything still held.
    fn process(&mut self, pcm: &[&[u8]], samples: usize, is_final: bool)
        -> Result<(), StretchError>;

    /// Samples ready to retrieve.
    fn available(&self) -> usize;

    /// Move up to `samples` ready samples into `out`, returning how many
    /// were moved.
    fn retrieve(&mut self, out: &mut [&mut [u8]], samples: usize) -> usize;

    /// PCM layout of retrieved samples.
    fn spec(&self) -> &SampleSpec;
}

/// [`TimeStretcher`] backed by an `atempo` filter graph
pub struct AtempoStretcher {
    graph: filter::Graph,
    spec: SampleSpec,
    pts: i64,
    ready: SampleFifo,
    finished: bool,
}

fn layout_name(spec: &SampleSpec) -> &'static str {
    if spec.channels == 1 {
        "mono"
    } else {
        "stereo"
    }
}

/// Queue `produced` filtered samples, failing if any are left behind.
fn stash(ready: &mut SampleFifo, planes: &[&[u8]], produced: usize) -> Result<(), StretchError> {
    let written = ready.write(planes, produced);
    if written != produced {
        return Err(StretchError::SinkWrite { produced, written });
    }
    Ok(())
}

fn graph_err(e: ffmpeg::Error) -> StretchError {
    StretchError::Graph(e.to_string())
}

impl AtempoStretcher {
    /// Build a stretcher that plays `spec` audio at `tempo` times its
    /// original speed.
    pub fn new(spec: SampleSpec, tempo: f64) -> Result<Self, StretchError> {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&tempo) {
            return Err(StretchError::InvalidTempo(tempo));
        }

        let mut graph = filter::Graph::new();

        let args = format!(
            "time_base=1/{rate}:sample_rate={rate}:sample_fmt={fmt}:channel_layout={layout}",
            rate = spec.rate,
            fmt = spec.format.name(),
            layout = layout_name(&spec),
        );
        let abuffer = filter::find("abuffer")
            .ok_or_else(|| StretchError::Graph("abuffer filter not available".into()))?;
        let abuffersink = filter::find("abuffersink")
            .ok_or_else(|| StretchError::Graph("abuffersink filter not available".into()))?;
        graph.add(&abuffer, "in", &args).map_err(graph_err)?;
        graph.add(&abuffersink, "out", "").map_err(graph_err)?;

        let chain = format!(
            "atempo={tempo},aformat=sample_fmts={fmt}:sample_rates={rate}:channel_layouts={layout}",
            tempo = tempo,
            fmt = spec.format.name(),
            rate = spec.rate,
            layout = layout_name(&spec),
        );
        graph
            .output("in", 0)
            .and_then(|p| p.input("out", 0))
            .and_then(|p| p.parse(&chain))
            .map_err(graph_err)?;
        graph.validate().map_err(graph_err)?;

        tracing::debug!(tempo, rate = spec.rate, "Built atempo filter graph");

        let ready = SampleFifo::new(spec.clone(), spec.rate as usize);
        Ok(Self {
            graph,
            spec,
            pts: 0,
            ready,
            finished: false,
        })
    }

    fn push(&mut self, pcm: &[&[u8]], samples: usize) -> Result<(), StretchError> {
        let mut frame =
            ffmpeg::util::frame::Audio::new(self.spec.format, samples, self.spec.layout.clone());
        if !helpers::frame_has_buffer(&frame) {
            return Err(StretchError::Process(ffmpeg::Error::Other {
                errno: ffmpeg::error::ENOMEM,
            }));
        }
        frame.set_rate(self.spec.rate);
        frame.set_pts(Some(self.pts));
        self.pts += samples as i64;

        let bytes = self.spec.plane_bytes(samples);
        for (dst, src) in helpers::audio_planes_mut(&mut frame).into_iter().zip(pcm) {
            dst[..bytes].copy_from_slice(&src[..bytes]);
        }

        let mut source = self
            .graph
            .get("in")
            .ok_or_else(|| StretchError::Graph("filter graph has no input".into()))?;
        source.source().add(&frame).map_err(StretchError::Process)
    }

    fn finish(&mut self) -> Result<(), StretchError> {
        let mut source = self
            .graph
            .get("in")
            .ok_or_else(|| StretchError::Graph("filter graph has no input".into()))?;
        source.source().flush().map_err(StretchError::Process)
    }

    fn pull(&mut self) -> Result<(), StretchError> {
        let mut sink = self
            .graph
            .get("out")
            .ok_or_else(|| StretchError::Graph("filter graph has no output".into()))?;
        loop {
            let mut frame = ffmpeg::util::frame::Audio::empty();
            match sink.sink().frame(&mut frame) {
                Ok(()) => {
                    let planes = helpers::audio_planes(&frame);
                    stash(&mut self.ready, &planes, frame.samples())?;
                }
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => break,
                Err(ffmpeg::Error::Eof) => break,
                Err(e) => return Err(StretchError::Process(e)),
            }
        }
        Ok(())
    }
}

impl TimeStretcher for AtempoStretcher {
    fn process(
        &mut self,
        pcm: &[&[u8]],
        samples: usize,
        is_final: bool,
    ) -> Result<(), StretchError> {
        if self.finished {
            return Err(StretchError::InvalidArgument(
                "input already finished".into(),
            ));
        }
        if samples > 0 {
            self.spec
                .check_planes(pcm, samples)
                .map_err(StretchError::InvalidArgument)?;
            self.push(pcm, samples)?;
        }
        if is_final {
            self.finish()?;
            self.finished = true;
        }
        self.pull()
    }

    fn available(&self) -> usize {
        self.ready.size()
    }

    fn retrieve(&mut self, out: &mut [&mut [u8]], samples: usize) -> usize {
        self.ready.read(out, samples)
    }

    fn spec(&self) -> &SampleSpec {
        &self.spec
    }
}

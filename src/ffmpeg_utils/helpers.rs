//! Raw-field access that `ffmpeg-next` does not expose safely: audio planes
//! sized by sample count, channel counts from `AVChannelLayout`, and encoder
//! format lists. Apart from the swresample calls, the crate's `unsafe` lives
//! here.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::format::sample::Sample;

// ── Audio frame planes ──────────────────────────────────────────────────────

/// Channel count of an audio frame, read from its `AVChannelLayout`.
pub fn frame_channels(frame: &ffmpeg::util::frame::Audio) -> u16 {
    // SAFETY: `frame.as_ptr()` is valid for the lifetime of `frame`.
    let channels = unsafe { (*frame.as_ptr()).ch_layout.nb_channels };
    channels.max(0) as u16
}

/// Number of data planes an audio frame carries.
fn plane_count(frame: &ffmpeg::util::frame::Audio) -> usize {
    let channels = frame_channels(frame) as usize;
    if frame.format().is_planar() {
        channels
    } else {
        1
    }
}

/// Borrow every data plane of an audio frame.
///
/// Planes are read through `extended_data` with `linesize[0]` as the length
/// of each plane: `ffmpeg-next`'s `Audio::data(index)` stops counting planes
/// when `linesize[1] == 0`, which is the normal case for planar audio.
/// Returns an empty `Vec` for frames without a buffer.
pub fn audio_planes(frame: &ffmpeg::util::frame::Audio) -> Vec<&[u8]> {
    let planes = plane_count(frame);
    // SAFETY: `extended_data` holds `planes` pointers, each to at least
    // `linesize[0]` bytes owned by the frame, for as long as `frame` is
    // borrowed.
    unsafe {
        let f = frame.as_ptr();
        let ptrs = (*f).extended_data;
        if ptrs.is_null() {
            return Vec::new();
        }
        let size = (*f).linesize[0] as usize;
        let mut out = Vec::with_capacity(planes);
        for index in 0..planes {
            let plane_ptr = *ptrs.add(index);
            if plane_ptr.is_null() {
                return Vec::new();
            }
            out.push(std::slice::from_raw_parts(plane_ptr as *const u8, size));
        }
        out
    }
}

/// Mutable version of [`audio_planes`].
pub fn audio_planes_mut(frame: &mut ffmpeg::util::frame::Audio) -> Vec<&mut [u8]> {
    let planes = plane_count(frame);
    // SAFETY: as for `audio_planes`; the planes never alias one another, so
    // handing out one `&mut` per plane is sound while `frame` is mutably
    // borrowed.
    unsafe {
        let f = frame.as_mut_ptr();
        let ptrs = (*f).extended_data;
        if ptrs.is_null() {
            return Vec::new();
        }
        let size = (*f).linesize[0] as usize;
        let mut out = Vec::with_capacity(planes);
        for index in 0..planes {
            let plane_ptr = *ptrs.add(index);
            if plane_ptr.is_null() {
                return Vec::new();
            }
            out.push(std::slice::from_raw_parts_mut(plane_ptr, size));
        }
        out
    }
}

/// Whether `av_frame_get_buffer` actually attached sample storage.
///
/// `frame::Audio::new` ignores allocation failure, so callers check this.
pub fn frame_has_buffer(frame: &ffmpeg::util::frame::Audio) -> bool {
    // SAFETY: reading a pointer field of a valid frame.
    unsafe { !(*frame.as_ptr()).data[0].is_null() }
}

/// Ensure the frame's buffers are not shared with the encoder before we
/// overwrite them.
///
/// Reallocation uses the frame's current `nb_samples`, so restore the full
/// capacity before calling this.
pub fn make_writable(frame: &mut ffmpeg::util::frame::Audio) -> Result<(), ffmpeg::Error> {
    // SAFETY: `frame.as_mut_ptr()` is a valid frame with format, layout and
    // sample count set.
    let ret = unsafe { ffmpeg::ffi::av_frame_make_writable(frame.as_mut_ptr()) };
    if ret < 0 {
        Err(ffmpeg::Error::from(ret))
    } else {
        Ok(())
    }
}

// ── Codec accessors ─────────────────────────────────────────────────────────

/// Allocate a fresh `AVCodecParameters`, copy the encoder context into it,
/// and return it as a safe `ffmpeg::codec::Parameters`.
///
/// Used to extract codec parameters from an encoder for muxer stream setup.
pub fn encoder_codec_parameters(
    encoder: &ffmpeg::codec::encoder::Audio,
) -> ffmpeg::codec::Parameters {
    use std::ops::Deref;
    use std::rc::Rc;
    let ctx: &ffmpeg::codec::Context = encoder.deref();
    // SAFETY: `avcodec_parameters_alloc` returns a valid pointer or null
    // (OOM only).  `avcodec_parameters_from_context` copies fields from a
    // live, open encoder context.
    unsafe {
        let params = ffmpeg::ffi::avcodec_parameters_alloc();
        ffmpeg::ffi::avcodec_parameters_from_context(params, ctx.as_ptr());
        ffmpeg::codec::Parameters::wrap(params, None::<Rc<dyn std::any::Any>>)
    }
}

/// Sample formats an encoder accepts, in its order of preference.
///
/// Returns `None` when the encoder does not restrict the format.
pub fn supported_sample_formats(codec: &ffmpeg::Codec) -> Option<Vec<Sample>> {
    let mut configs: *const std::ffi::c_void = std::ptr::null();
    let mut count: std::ffi::c_int = 0;
    // SAFETY: a null context asks for the codec's static configuration.  On
    // success `configs` points to `count` sample formats owned by the codec
    // descriptor, which lives for the whole program.
    unsafe {
        let ret = ffmpeg::ffi::avcodec_get_supported_config(
            std::ptr::null(),
            codec.as_ptr(),
            ffmpeg::ffi::AVCodecConfig::AV_CODEC_CONFIG_SAMPLE_FORMAT,
            0,
            &mut configs,
            &mut count,
        );
        if ret < 0 || configs.is_null() || count <= 0 {
            return None;
        }
        let formats = std::slice::from_raw_parts(
            configs as *const ffmpeg::ffi::AVSampleFormat,
            count as usize,
        );
        Some(formats.iter().map(|&f| Sample::from(f)).collect())
    }
}

/// Set the sample rate and default channel layout on a codec context before
/// it is opened.
///
/// Raw payload decoders (Opus without a container, PCM) have no codec
/// parameters to learn these from.
pub fn set_audio_params(ctx: &mut ffmpeg::codec::Context, sample_rate: u32, channels: u16) {
    // SAFETY: `ctx.as_mut_ptr()` is valid for the lifetime of `ctx` and the
    // context has not been opened yet.  `av_channel_layout_default` fully
    // initialises the layout it is given.
    unsafe {
        let c = ctx.as_mut_ptr();
        (*c).sample_rate = sample_rate as i32;
        ffmpeg::ffi::av_channel_layout_uninit(&mut (*c).ch_layout);
        ffmpeg::ffi::av_channel_layout_default(&mut (*c).ch_layout, channels as i32);
    }
}

/// Default audio codec of the muxer attached to an output context.
pub fn output_audio_codec(output: &ffmpeg::format::context::Output) -> ffmpeg::codec::Id {
    // SAFETY: an allocated output context always has a non-null `oformat`.
    unsafe { ffmpeg::codec::Id::from((*(*output.as_ptr()).oformat).audio_codec) }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

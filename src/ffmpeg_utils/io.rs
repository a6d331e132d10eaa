//! Output context management
//!
//! `ffmpeg::format::output()` allocates the muxer context and opens the file
//! in one call. The dumper needs the two apart: the file is only created
//! once the encoder, stream and buffers are known to be good, and closed
//! separately from freeing the context.

use ffmpeg_next as ffmpeg;
use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr;

/// Convert a filesystem path to the C string FFmpeg expects.
pub fn path_to_cstring(path: &Path) -> Option<CString> {
    path.to_str().and_then(|s| CString::new(s).ok())
}

/// Allocate an output context, deducing the muxer from the file name.
///
/// No file is opened.  The returned `Output` frees the context on drop and
/// closes `pb` if one was opened later.
pub fn alloc_output(path: &CStr) -> Result<ffmpeg::format::context::Output, ffmpeg::Error> {
    unsafe {
        let mut output_ptr: *mut ffmpeg::ffi::AVFormatContext = ptr::null_mut();

        let ret = ffmpeg::ffi::avformat_alloc_output_context2(
            &mut output_ptr,
            ptr::null_mut(),
            ptr::null(),
            path.as_ptr(),
        );

        if ret < 0 {
            return Err(ffmpeg::Error::from(ret));
        }
        if output_ptr.is_null() {
            return Err(ffmpeg::Error::MuxerNotFound);
        }

        Ok(ffmpeg::format::context::Output::wrap(output_ptr))
    }
}

/// Whether the muxer writes through its own I/O rather than a file we open.
pub fn is_file_less(output: &ffmpeg::format::context::Output) -> bool {
    output
        .format()
        .flags()
        .contains(ffmpeg::format::Flags::NO_FILE)
}

/// Whether the muxer wants codec extradata in a global header.
pub fn wants_global_header(output: &ffmpeg::format::context::Output) -> bool {
    output
        .format()
        .flags()
        .contains(ffmpeg::format::Flags::GLOBAL_HEADER)
}

/// Open the output file for writing and attach it to the context.
pub fn open_output_file(
    output: &mut ffmpeg::format::context::Output,
    path: &CStr,
) -> Result<(), ffmpeg::Error> {
    // SAFETY: `output.as_mut_ptr()` is a valid context whose `pb` is still
    // null; `avio_open` either sets it or leaves it null on failure.
    let ret = unsafe {
        let ctx = output.as_mut_ptr();
        ffmpeg::ffi::avio_open(
            &mut (*ctx).pb,
            path.as_ptr(),
            ffmpeg::ffi::AVIO_FLAG_WRITE as std::ffi::c_int,
        )
    };
    if ret < 0 {
        Err(ffmpeg::Error::from(ret))
    } else {
        Ok(())
    }
}

/// Close the output file, leaving `pb` null so dropping the context does
/// not close it twice.
pub fn close_output_file(output: &mut ffmpeg::format::context::Output) {
    // SAFETY: `avio_closep` accepts a null `pb` and nulls it after closing.
    unsafe {
        let ctx = output.as_mut_ptr();
        if !ctx.is_null() {
            ffmpeg::ffi::avio_closep(&mut (*ctx).pb);
        }
    }
}

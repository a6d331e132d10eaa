//! Positioned reader for TLV capture files
//!
//! Each record is a 15-byte little-endian header followed by a payload:
//!
//! | offset | field             | size |
//! |--------|-------------------|------|
//! | 0      | record length     | 2    |
//! | 2      | marker            | 1    |
//! | 3      | sequence          | 2    |
//! | 5      | RTP timestamp     | 4    |
//! | 9      | capture timestamp | 6    |
//! | 15     | payload           | rest |
//!
//! The record length covers the header. The cursor only ever moves by the
//! declared length of a fully-read record.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::RecordError;

/// Size of the fixed record header in bytes
pub const HEADER_LEN: usize = 15;

/// Largest record the 16-bit length field can describe
pub const MAX_RECORD_LEN: usize = u16::MAX as usize;

/// One record, borrowing its payload from the caller's read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub marker: bool,
    pub sequence: u16,
    pub rtp_timestamp: u32,
    /// 48-bit capture clock, milliseconds since the Unix epoch on the
    /// capture devices we have seen.
    pub capture_timestamp: u64,
    pub payload: &'a [u8],
}

impl Record<'_> {
    /// Total encoded length, header included.
    pub fn len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Capture timestamp as wall-clock time, if it is in range.
    pub fn capture_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.capture_timestamp as i64)
    }
}

/// Decode the fixed header fields out of `buf`.
///
/// Returns `(length, marker, sequence, rtp_timestamp, capture_timestamp)`.
pub(crate) fn parse_header(buf: &[u8; HEADER_LEN]) -> (usize, bool, u16, u32, u64) {
    let length = u16::from_le_bytes([buf[0], buf[1]]) as usize;
    let marker = buf[2] != 0;
    let sequence = u16::from_le_bytes([buf[3], buf[4]]);
    let rtp_timestamp = u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]);

    // Highest-index byte is shifted in first
    let capture_timestamp = buf[9..15]
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64);

    (length, marker, sequence, rtp_timestamp, capture_timestamp)
}

/// Reader over a TLV capture.
///
/// A default-constructed or closed reader is inert and only reports
/// [`RecordError::NotOpen`].
#[derive(Debug)]
pub struct RecordReader<R = File> {
    inner: Option<R>,
    pos: u64,
}

impl<R> Default for RecordReader<R> {
    fn default() -> Self {
        Self {
            inner: None,
            pos: 0,
        }
    }
}

impl RecordReader<File> {
    /// Open a capture file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RecordError> {
        let file = File::open(path.as_ref())
            .map_err(|source| RecordError::Io { offset: 0, source })?;

        tracing::debug!(path = %path.as_ref().display(), "Opened capture file");

        Ok(Self::new(file))
    }
}

impl<R: Read + Seek> RecordReader<R> {
    /// Wrap an already-open source, starting at offset 0.
    pub fn new(inner: R) -> Self {
        Self {
            inner: Some(inner),
            pos: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Byte offset of the next record.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Release the source and return to the inert state.
    pub fn close(&mut self) {
        self.inner = None;
        self.pos = 0;
    }

    /// Read the record at the cursor into `buf`.
    ///
    /// Returns `Ok(None)` once the source is exhausted; further calls keep
    /// returning `Ok(None)`. On error the cursor does not move.
    pub fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<Option<Record<'b>>, RecordError> {
        if buf.len() < HEADER_LEN {
            return Err(RecordError::InvalidArgument {
                capacity: buf.len(),
                header: HEADER_LEN,
            });
        }

        let offset = self.pos;
        let inner = self.inner.as_mut().ok_or(RecordError::NotOpen)?;
        let nbytes =
            read_at(inner, offset, buf).map_err(|source| RecordError::Io { offset, source })?;

        if nbytes == 0 {
            return Ok(None);
        }

        if nbytes < HEADER_LEN {
            return Err(RecordError::MalformedHeader {
                offset,
                available: nbytes,
            });
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&buf[..HEADER_LEN]);
        let (declared, marker, sequence, rtp_timestamp, capture_timestamp) =
            parse_header(&header);

        if declared < HEADER_LEN {
            return Err(RecordError::InvalidLength { offset, declared });
        }

        if declared > nbytes {
            // Only a full buffer can hide the rest of the record
            if nbytes < buf.len() {
                return Err(RecordError::EarlyEndOfStream {
                    offset,
                    declared,
                    available: nbytes,
                });
            }
            return Err(RecordError::BufferTooSmall {
                offset,
                declared,
                capacity: buf.len(),
            });
        }

        self.pos += declared as u64;

        Ok(Some(Record {
            marker,
            sequence,
            rtp_timestamp,
            capture_timestamp,
            payload: &buf[HEADER_LEN..declared],
        }))
    }
}

/// Fill as much of `buf` as the source holds from `offset`.
fn read_at<R: Read + Seek>(src: &mut R, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    src.seek(SeekFrom::Start(offset))?;

    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

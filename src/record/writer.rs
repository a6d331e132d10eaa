//! TLV record serialisation

use std::io::{self, Write};

use super::reader::{HEADER_LEN, MAX_RECORD_LEN};

/// Largest value the 6-byte capture timestamp field can hold
pub const MAX_CAPTURE_TIMESTAMP: u64 = (1 << 48) - 1;

/// Header fields of a record to be written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordHeader {
    pub marker: bool,
    pub sequence: u16,
    pub rtp_timestamp: u32,
    pub capture_timestamp: u64,
}

/// Encode one record into `out`, returning the encoded length.
pub fn encode_record(out: &mut Vec<u8>, header: &RecordHeader, payload: &[u8]) -> io::Result<usize> {
    let len = HEADER_LEN + payload.len();
    if len > MAX_RECORD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("record of {} bytes exceeds {}", len, MAX_RECORD_LEN),
        ));
    }
    if header.capture_timestamp > MAX_CAPTURE_TIMESTAMP {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "capture timestamp {} does not fit in 48 bits",
                header.capture_timestamp
            ),
        ));
    }

    out.reserve(len);
    out.extend_from_slice(&(len as u16).to_le_bytes());
    out.push(header.marker as u8);
    out.extend_from_slice(&header.sequence.to_le_bytes());
    out.extend_from_slice(&header.rtp_timestamp.to_le_bytes());
    out.extend_from_slice(&header.capture_timestamp.to_le_bytes()[..6]);
    out.extend_from_slice(payload);

    Ok(len)
}

/// Sequential writer producing a capture file the reader understands.
pub struct RecordWriter<W: Write> {
    inner: W,
    scratch: Vec<u8>,
    written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: Vec::with_capacity(512),
            written: 0,
        }
    }

    /// Append one record.
    pub fn write(&mut self, header: &RecordHeader, payload: &[u8]) -> io::Result<usize> {
        self.scratch.clear();
        let len = encode_record(&mut self.scratch, header, payload)?;
        self.inner.write_all(&self.scratch)?;
        self.written += len as u64;
        Ok(len)
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_layout() {
        let mut out = Vec::new();
        let header = RecordHeader {
            marker: true,
            sequence: 0x0102,
            rtp_timestamp: 0x0A0B_0C0D,
            capture_timestamp: 0x0000_1122_3344_5566,
        };
        let len = encode_record(&mut out, &header, &[0xEE, 0xFF]).unwrap();

        assert_eq!(len, 17);
        assert_eq!(
            out,
            vec![
                17, 0, 1, 0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11,
                0xEE, 0xFF
            ]
        );
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let mut out = Vec::new();
        let payload = vec![0u8; MAX_RECORD_LEN];
        let err = encode_record(&mut out, &RecordHeader::default(), &payload).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(out.is_empty());
    }

    #[test]
    fn test_rejects_wide_capture_timestamp() {
        let mut out = Vec::new();
        let header = RecordHeader {
            capture_timestamp: MAX_CAPTURE_TIMESTAMP + 1,
            ..Default::default()
        };
        assert!(encode_record(&mut out, &header, &[]).is_err());
    }

    #[test]
    fn test_writer_counts_bytes() {
        let mut writer = RecordWriter::new(Vec::new());
        writer.write(&RecordHeader::default(), &[1, 2, 3]).unwrap();
        writer.write(&RecordHeader::default(), &[]).unwrap();
        assert_eq!(writer.bytes_written(), 33);
        assert_eq!(writer.into_inner().len(), 33);
    }
}

//! TLV capture records
//!
//! - Positioned, length-trusting record reader
//! - Record writer producing the same layout
//! - Sequence number discontinuity tracking

pub mod reader;
pub mod sequence;
pub mod writer;

pub use reader::{Record, RecordReader, HEADER_LEN, MAX_RECORD_LEN};
pub use sequence::{SequenceEvent, SequenceTracker};
pub use writer::{encode_record, RecordHeader, RecordWriter};

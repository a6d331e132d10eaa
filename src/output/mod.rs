//! Output stage: PCM in, finished container file out

pub mod dumper;

pub use dumper::{AudioDumper, DumpOutcome, DumperOptions, DumperState, MAX_FRAME_SIZE};

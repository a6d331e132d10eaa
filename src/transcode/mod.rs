//! Collaborators on either side of the PCM path:
//! - Payload decoding (Opus or any FFmpeg audio decoder)
//! - Optional tempo change via the `atempo` filter graph

pub mod decoder;
pub mod stretch;

pub use decoder::PayloadDecoder;
pub use stretch::{AtempoStretcher, TimeStretcher};

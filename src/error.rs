use thiserror::Error;

use crate::output::DumperState;

/// Top-level error type for a remux run
#[derive(Error, Debug)]
pub enum AppError {
    /// The capture file could not be opened or read
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// The payload decoder could not be created or failed fatally
    #[error("Decoder error: {0}")]
    Decode(#[from] DecodeError),

    /// The time stretcher could not be created or failed
    #[error("Time stretch error: {0}")]
    Stretch(#[from] StretchError),

    /// The output stage could not be constructed
    #[error("Output init error: {0}")]
    DumperInit(#[from] DumperInitError),

    /// The output stage failed while streaming
    #[error("Output error: {0}")]
    Dump(#[from] DumpError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Global FFmpeg initialization failed
    #[error("FFmpeg initialization failed: {0}")]
    FfmpegInit(String),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by [`crate::record::RecordReader::read`]
#[derive(Error, Debug)]
pub enum RecordError {
    /// The caller's buffer cannot even hold a record header
    #[error("Invalid argument: buffer of {capacity} bytes is shorter than the {header} byte header")]
    InvalidArgument { capacity: usize, header: usize },

    /// The reader was never opened or has been closed
    #[error("Record reader is not open")]
    NotOpen,

    /// The underlying read or seek failed
    #[error("IO error at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Fewer than a header's worth of bytes remain before end of file
    #[error("Malformed record header at offset {offset}: only {available} bytes available")]
    MalformedHeader { offset: u64, available: usize },

    /// The declared length cannot even cover the header
    #[error("Invalid record length {declared} at offset {offset}")]
    InvalidLength { offset: u64, declared: usize },

    /// The source ended before the declared record length
    #[error("Early end of stream at offset {offset}: record declares {declared} bytes, {available} available")]
    EarlyEndOfStream {
        offset: u64,
        declared: usize,
        available: usize,
    },

    /// The buffer filled up before the declared record length was reached
    #[error("Buffer too small at offset {offset}: record declares {declared} bytes, buffer holds {capacity}")]
    BufferTooSmall {
        offset: u64,
        declared: usize,
        capacity: usize,
    },
}

impl RecordError {
    /// Whether this error means the capture ends in a damaged record rather
    /// than the reader or caller misbehaving.
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            RecordError::MalformedHeader { .. }
                | RecordError::InvalidLength { .. }
                | RecordError::EarlyEndOfStream { .. }
        )
    }
}

/// Errors returned by [`crate::audio::SampleResampler`]
#[derive(Error, Debug)]
pub enum ResampleError {
    /// The conversion context could not be created
    #[error("Failed to create resampling context: {0}")]
    Init(#[source] ffmpeg_next::Error),

    /// Input planes do not match the declared layout or sample count
    #[error("Invalid resampler input: {0}")]
    InvalidArgument(String),

    /// The resampler has no live conversion context
    #[error("Resampler is not initialized")]
    NotInitialized,

    /// `swr_get_out_samples` rejected the request
    #[error("Failed to query output capacity for {samples} input samples: {code}")]
    CapacityQuery { samples: usize, code: i32 },

    /// The scratch buffer could not grow to the requested size
    #[error("Failed to allocate scratch buffer for {samples} samples")]
    Allocation { samples: usize },

    /// `swr_convert` failed
    #[error("Sample conversion failed: {0}")]
    Conversion(#[source] ffmpeg_next::Error),

    /// The sink accepted fewer samples than were produced
    #[error("Sample FIFO accepted {written} of {produced} samples")]
    SinkWrite { produced: usize, written: usize },
}

/// Step of [`crate::output::AudioDumper::open`] that failed
#[derive(Error, Debug)]
pub enum DumperInitError {
    /// The output path is not representable as a C string
    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    /// No muxer matches the output file extension
    #[error("Could not deduce output format from file extension of {path}: {source}")]
    OutputFormat {
        path: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    /// The muxer has no default audio codec
    #[error("Output format '{0}' does not carry audio")]
    NoAudioCodec(String),

    /// The muxer's audio codec has no encoder in this FFmpeg build
    #[error("Could not find encoder for '{0}'")]
    EncoderNotFound(String),

    /// The encoder refused the configuration
    #[error("Could not open audio codec: {0}")]
    EncoderOpen(#[source] ffmpeg_next::Error),

    /// The encoder demands fixed frames but reports no frame size
    #[error("Encoder requires fixed-size frames but reports a frame size of 0")]
    FrameSize,

    /// The output stream could not be added or configured
    #[error("Could not allocate stream: {0}")]
    Stream(#[source] ffmpeg_next::Error),

    /// The reusable encode frame could not be allocated
    #[error("Could not allocate frame data for {0} samples")]
    FrameAlloc(usize),

    /// The embedded resampler could not be created
    #[error("Could not create resampler: {0}")]
    Resampler(#[from] ResampleError),

    /// The output file could not be opened for writing
    #[error("Could not open '{path}': {source}")]
    FileOpen {
        path: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    /// The container header could not be written
    #[error("Error occurred when opening output file: {0}")]
    WriteHeader(#[source] ffmpeg_next::Error),
}

/// Which part of [`crate::output::AudioDumper::dump`] an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Draining whole frames out of the FIFO
    Framing,
    /// Draining the final partial frame and the encoder at end of stream
    Flush,
    /// Copying input straight into the encode frame
    Passthrough,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Framing => "framing",
            Phase::Flush => "flush",
            Phase::Passthrough => "passthrough",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`crate::output::AudioDumper::dump`] and `close`
#[derive(Error, Debug)]
pub enum DumpError {
    /// Sample count out of range or planes too short
    #[error("Invalid dump argument: {0}")]
    InvalidArgument(String),

    /// `dump` was called outside the streaming state
    #[error("Dumper is not streaming (state: {0:?})")]
    NotStreaming(DumperState),

    /// The embedded resampler failed
    #[error("Resample failed: {0}")]
    Resample(#[from] ResampleError),

    /// The FIFO accepted fewer samples than offered
    #[error("FIFO accepted {written} of {offered} samples")]
    BufferWrite { offered: usize, written: usize },

    /// The encode frame could not be made writable
    #[error("[{phase}] Frame is not writable: {source}")]
    FrameNotWritable {
        phase: Phase,
        #[source]
        source: ffmpeg_next::Error,
    },

    /// The FIFO yielded fewer samples than it reported
    #[error("[{phase}] FIFO read returned {got} of {wanted} samples")]
    FifoRead {
        phase: Phase,
        wanted: usize,
        got: usize,
    },

    /// The encoder rejected a frame or the end-of-stream signal
    #[error("[{phase}] Encoder send failed: {source}")]
    SendFrame {
        phase: Phase,
        #[source]
        source: ffmpeg_next::Error,
    },

    /// The encoder failed while producing a packet
    #[error("[{phase}] Encoder receive_packet failed: {source}")]
    ReceivePacket {
        phase: Phase,
        #[source]
        source: ffmpeg_next::Error,
    },

    /// The muxer refused a packet
    #[error("[{phase}] Failed to write packet: {source}")]
    WritePacket {
        phase: Phase,
        #[source]
        source: ffmpeg_next::Error,
    },

    /// The container trailer could not be written
    #[error("Failed to write trailer: {0}")]
    WriteTrailer(#[source] ffmpeg_next::Error),
}

/// Errors from [`crate::transcode::PayloadDecoder`]
#[derive(Error, Debug)]
pub enum DecodeError {
    /// No decoder with this name exists
    #[error("Failed to find decoder: {0}")]
    NotFound(String),

    /// The decoder refused the configuration
    #[error("Failed to open decoder '{codec}': {source}")]
    Open {
        codec: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    /// A payload could not be decoded
    #[error("Failed to decode payload: {0}")]
    Decode(#[source] ffmpeg_next::Error),
}

/// Errors from [`crate::transcode::TimeStretcher`] implementations
#[derive(Error, Debug)]
pub enum StretchError {
    /// Tempo outside what the filter supports
    #[error("Tempo {0} outside [0.5, 100.0]")]
    InvalidTempo(f64),

    /// The filter graph could not be built
    #[error("Failed to build filter graph: {0}")]
    Graph(String),

    /// The filter graph rejected a frame
    #[error("Filter processing failed: {0}")]
    Process(#[source] ffmpeg_next::Error),

    /// Input planes do not match the declared layout
    #[error("Invalid stretch input: {0}")]
    InvalidArgument(String),

    /// The ready queue accepted fewer samples than the filter produced
    #[error("Stretch queue accepted {written} of {produced} samples")]
    SinkWrite { produced: usize, written: usize },
}

/// Errors from loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A value failed validation
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

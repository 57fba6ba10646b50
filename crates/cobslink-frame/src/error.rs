use std::io;

/// Malformed COBS structure inside a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CobsError {
    /// Nothing between the sentinels to decode.
    #[error("empty stuffed payload")]
    Empty,

    /// A zero byte appeared inside stuffed data.
    #[error("zero byte at offset {offset} inside stuffed payload")]
    ZeroByte { offset: usize },

    /// A code byte points past the end of the buffer.
    #[error("code byte {code:#04x} at offset {offset} needs {needed} bytes, {available} left")]
    Overrun {
        offset: usize,
        code: u8,
        needed: usize,
        available: usize,
    },
}

/// Malformed or unencodable structured payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The CBOR item could not be parsed.
    #[error("invalid CBOR payload: {0}")]
    Decode(String),

    /// Bytes were left over after the first CBOR item.
    #[error("{0} trailing bytes after CBOR item")]
    TrailingBytes(usize),

    /// The message could not be serialized.
    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    /// Integer outside the CBOR range (-2^64 ..= 2^64-1).
    #[error("integer {0} out of CBOR range")]
    IntegerOutOfRange(i128),

    /// A bignum tag (2 or 3) whose byte string would decode as a different
    /// value. Values in the integer range belong in `Message::Integer`.
    #[error("tag {tag} bignum of {len} bytes is not in canonical form")]
    NonCanonicalBignum { tag: u64, len: usize },
}

/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame's stuffed payload is not valid COBS.
    #[error("framing error: {0}")]
    Cobs(#[from] CobsError),

    /// The unstuffed payload is too short to carry a checksum.
    #[error("framing error: unstuffed payload is {len} bytes, need at least 4")]
    Truncated { len: usize },

    /// The frame grew past the configured bound before its closing sentinel.
    #[error("framing error: frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The stored CRC32 does not match the payload.
    #[error("integrity error: checksum mismatch (expected {expected:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { expected: u32, computed: u32 },

    /// The payload passed integrity checks but is not a valid message.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No byte arrived within the read timeout. The partial frame is kept.
    #[error("read timed out")]
    Timeout,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream reached end-of-file.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Coarse grouping of [`FrameError`] for reporting and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Framing,
    Integrity,
    Codec,
    Timeout,
    Transport,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Framing => "framing",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Codec => "codec",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transport => "transport",
        }
    }
}

impl FrameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FrameError::Cobs(_) | FrameError::Truncated { .. } | FrameError::FrameTooLarge { .. } => {
                ErrorKind::Framing
            }
            FrameError::ChecksumMismatch { .. } => ErrorKind::Integrity,
            FrameError::Codec(_) => ErrorKind::Codec,
            FrameError::Timeout => ErrorKind::Timeout,
            FrameError::Io(_) | FrameError::ConnectionClosed => ErrorKind::Transport,
        }
    }

    /// True when the stream is still usable after this error.
    ///
    /// Only transport loss is fatal; a bad frame or an idle line is not.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Transport
    }
}

impl From<cobslink_transport::TransportError> for FrameError {
    fn from(err: cobslink_transport::TransportError) -> Self {
        match err {
            cobslink_transport::TransportError::Io(io)
            | cobslink_transport::TransportError::Accept(io) => FrameError::Io(io),
            cobslink_transport::TransportError::Open { source, .. }
            | cobslink_transport::TransportError::Bind { source, .. }
            | cobslink_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
            other => FrameError::Io(io::Error::other(other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

use std::path::PathBuf;

/// Errors that can occur in device and client operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] cobslink_transport::TransportError),

    /// Frame-level error that ended the session.
    #[error("frame error: {0}")]
    Frame(#[from] cobslink_frame::FrameError),

    /// The command table file could not be read.
    #[error("failed to read command table {path}: {source}")]
    TableRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The command table is not valid JSON of the expected shape.
    #[error("invalid command table: {0}")]
    TableParse(#[from] serde_json::Error),

    /// The link closed before a reply arrived.
    #[error("link closed before a reply arrived")]
    Disconnected,

    /// No reply arrived in time.
    #[error("no reply within {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, DeviceError>;

use std::fmt;
use std::io;

use cobslink_device::DeviceError;
use cobslink_frame::{ErrorKind, FrameError};
use cobslink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(err.kind()), format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match (&err, err.io_source()) {
        (TransportError::UnsupportedBaudRate(_), _) => USAGE,
        (_, Some(source)) => io_code(source.kind()),
        (_, None) => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        other => match other.kind() {
            ErrorKind::Framing | ErrorKind::Integrity | ErrorKind::Codec => {
                CliError::new(DATA_INVALID, format!("{context}: {other}"))
            }
            ErrorKind::Timeout | ErrorKind::Transport => {
                CliError::new(INTERNAL, format!("{context}: {other}"))
            }
        },
    }
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::Transport(err) => transport_error(context, err),
        DeviceError::Frame(err) => frame_error(context, err),
        DeviceError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        DeviceError::Disconnected => CliError::new(FAILURE, format!("{context}: {err}")),
        DeviceError::TableRead { .. } | DeviceError::TableParse(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_by_kind() {
        let err = frame_error(
            "decode",
            FrameError::ChecksumMismatch {
                expected: 1,
                computed: 2,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("decode: "));

        assert_eq!(frame_error("read", FrameError::Timeout).code, TIMEOUT);
        assert_eq!(
            frame_error("read", FrameError::ConnectionClosed).code,
            FAILURE
        );
    }

    #[test]
    fn transport_errors_map_through_io_source() {
        let missing = transport_error(
            "connect failed",
            TransportError::Connect {
                path: "/tmp/missing.sock".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(missing.code, FAILURE);
        assert!(missing.message.contains("/tmp/missing.sock"));

        let not_tty = transport_error(
            "open failed",
            TransportError::NotATerminal {
                path: "/tmp/plain".into(),
            },
        );
        assert_eq!(not_tty.code, TRANSPORT_ERROR);

        assert_eq!(
            transport_error("open failed", TransportError::UnsupportedBaudRate(1234)).code,
            USAGE
        );
    }

    #[test]
    fn device_errors_map() {
        assert_eq!(
            device_error("send", DeviceError::Timeout(std::time::Duration::from_secs(1))).code,
            TIMEOUT
        );
        assert_eq!(
            device_error(
                "open",
                DeviceError::Transport(TransportError::UnsupportedBaudRate(1234))
            )
            .code,
            USAGE
        );
        assert_eq!(
            device_error(
                "open",
                DeviceError::Transport(TransportError::Io(io::Error::from(
                    io::ErrorKind::PermissionDenied
                )))
            )
            .code,
            PERMISSION_DENIED
        );
    }
}

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected duplex byte stream implementing Read + Write.
///
/// This is the only I/O type the framing layer sees. It wraps either a
/// serial TTY or a Unix domain socket stream.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    #[cfg(unix)]
    Serial(crate::serial::SerialPort),
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.read(buf),
            #[cfg(unix)]
            LinkStreamInner::Serial(port) => port.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.write(buf),
            #[cfg(unix)]
            LinkStreamInner::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.flush(),
            #[cfg(unix)]
            LinkStreamInner::Serial(port) => port.flush(),
        }
    }
}

impl LinkStream {
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Unix(stream),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_serial(port: crate::serial::SerialPort) -> Self {
        Self {
            inner: LinkStreamInner::Serial(port),
        }
    }

    /// A connected pair of in-process streams (socketpair).
    ///
    /// Bytes written to one end are read from the other.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream.
    ///
    /// A read that times out surfaces as `WouldBlock` (sockets) or
    /// `TimedOut` (serial) and does not close the stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            LinkStreamInner::Serial(port) => port.set_read_timeout(timeout),
        }
    }

    /// Set write timeout on the underlying stream.
    ///
    /// Serial writes block until the driver accepts the bytes; the timeout
    /// is ignored there.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            LinkStreamInner::Serial(_) => Ok(()),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            #[cfg(unix)]
            LinkStreamInner::Serial(port) => Ok(Self::from_serial(port.try_clone()?)),
        }
    }

    /// Short transport name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => "unix",
            #[cfg(unix)]
            LinkStreamInner::Serial(_) => "serial",
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => f.debug_struct("LinkStream").field("type", &"unix").finish(),
            #[cfg(unix)]
            LinkStreamInner::Serial(port) => f
                .debug_struct("LinkStream")
                .field("type", &"serial")
                .field("path", &port.path())
                .finish(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn pair_carries_bytes_both_ways() {
        let (mut left, mut right) = LinkStream::pair().unwrap();

        left.write_all(b"\x00ping\x00").unwrap();
        let mut buf = [0u8; 6];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"\x00ping\x00");

        right.write_all(b"pong").unwrap();
        let mut buf = [0u8; 4];
        left.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn read_timeout_does_not_close_stream() {
        let (mut left, mut right) = LinkStream::pair().unwrap();
        right
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 1];
        let err = right.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::WouldBlock | ErrorKind::TimedOut
        ));

        left.write_all(b"x").unwrap();
        assert_eq!(right.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'x');
    }

    #[test]
    fn cloned_stream_shares_connection() {
        let (left, mut right) = LinkStream::pair().unwrap();
        let mut writer = left.try_clone().unwrap();

        writer.write_all(b"ok").unwrap();
        let mut buf = [0u8; 2];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ok");
        assert_eq!(left.kind(), "unix");
    }
}

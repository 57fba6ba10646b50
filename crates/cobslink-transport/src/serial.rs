use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::LinkStream;

/// Default line speed, matching the devices this link talks to.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Baud rates accepted by [`SerialPort::open`].
pub const SUPPORTED_BAUD_RATES: &[u32] = &[9_600, 19_200, 38_400, 57_600, 115_200, 230_400];

/// Line settings for a serial device. Always 8N1, raw, no flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// `None` blocks until at least one byte arrives.
    pub read_timeout: Option<Duration>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Some(Duration::from_secs(1)),
        }
    }
}

/// A serial TTY opened in raw mode.
///
/// Reads that time out return an `ErrorKind::TimedOut` error rather than
/// `Ok(0)`, so callers never mistake an idle line for end-of-stream.
pub struct SerialPort {
    file: File,
    path: PathBuf,
}

impl SerialPort {
    /// Open a TTY device and configure it for raw 8N1 at `config.baud_rate`.
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_to_speed(config.baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;
        let fd = file.as_raw_fd();

        let mut tio = get_termios(fd).map_err(|e| {
            if e.raw_os_error() == Some(libc::ENOTTY) {
                TransportError::NotATerminal { path: path.clone() }
            } else {
                TransportError::Open {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;

        // SAFETY: `tio` is a valid, initialized termios obtained from tcgetattr.
        unsafe {
            libc::cfmakeraw(&mut tio);
            libc::cfsetispeed(&mut tio, speed);
            libc::cfsetospeed(&mut tio, speed);
        }
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cflag &= !libc::CSTOPB;
        apply_read_timeout(&mut tio, config.read_timeout);
        set_termios(fd, &tio)?;

        info!(?path, baud = config.baud_rate, "opened serial device");
        Ok(Self { file, path })
    }

    /// Open a serial device and wrap it as a [`LinkStream`].
    pub fn open_stream(path: impl AsRef<Path>, config: &SerialConfig) -> Result<LinkStream> {
        Self::open(path, config).map(LinkStream::from_serial)
    }

    /// Change the read timeout (rounded up to tenths of a second, max 25.5 s).
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let fd = self.file.as_raw_fd();
        let mut tio = get_termios(fd)?;
        apply_read_timeout(&mut tio, timeout);
        set_termios(fd, &tio)?;
        debug!(path = ?self.path, ?timeout, "serial read timeout updated");
        Ok(())
    }

    /// Duplicate the file descriptor. Line settings are shared.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.file.read(buf)? {
            0 => Err(std::io::Error::new(
                ErrorKind::TimedOut,
                "serial read timed out",
            )),
            n => Ok(n),
        }
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn baud_to_speed(baud: u32) -> Result<libc::speed_t> {
    let speed = match baud {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}

/// VMIN/VTIME pair for a read timeout. VTIME counts deciseconds.
fn vmin_vtime(timeout: Option<Duration>) -> (libc::cc_t, libc::cc_t) {
    match timeout {
        None => (1, 0),
        Some(timeout) => {
            let tenths = timeout.as_millis().div_ceil(100).clamp(1, 255);
            (0, tenths as libc::cc_t)
        }
    }
}

fn apply_read_timeout(tio: &mut libc::termios, timeout: Option<Duration>) {
    let (vmin, vtime) = vmin_vtime(timeout);
    tio.c_cc[libc::VMIN] = vmin;
    tio.c_cc[libc::VTIME] = vtime;
}

fn get_termios(fd: RawFd) -> std::io::Result<libc::termios> {
    // SAFETY: termios is plain old data; an all-zero value is a valid
    // placeholder that tcgetattr overwrites on success.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `fd` is an open descriptor owned by the caller and `tio` is a
    // valid writable termios.
    let rc = unsafe { libc::tcgetattr(fd, &mut tio) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(tio)
}

fn set_termios(fd: RawFd, tio: &libc::termios) -> std::io::Result<()> {
    // SAFETY: `fd` is an open descriptor and `tio` points to a valid termios.
    let rc = unsafe { libc::tcsetattr(fd, libc::TCSANOW, tio) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_baud_rate_rejected_before_open() {
        let result = SerialPort::open(
            "/nonexistent/tty",
            &SerialConfig {
                baud_rate: 12_345,
                ..SerialConfig::default()
            },
        );
        assert!(matches!(
            result,
            Err(TransportError::UnsupportedBaudRate(12_345))
        ));
    }

    #[test]
    fn missing_device_reports_open_error() {
        let result = SerialPort::open("/nonexistent/tty", &SerialConfig::default());
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn regular_file_is_not_a_terminal() {
        let dir = std::env::temp_dir().join(format!("cobslink-serial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("not-a-tty");
        std::fs::write(&path, b"").unwrap();

        let result = SerialPort::open(&path, &SerialConfig::default());
        assert!(matches!(result, Err(TransportError::NotATerminal { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_timeout_maps_to_deciseconds() {
        assert_eq!(vmin_vtime(None), (1, 0));
        assert_eq!(vmin_vtime(Some(Duration::from_secs(1))), (0, 10));
        assert_eq!(vmin_vtime(Some(Duration::from_millis(150))), (0, 2));
        assert_eq!(vmin_vtime(Some(Duration::from_millis(1))), (0, 1));
        assert_eq!(vmin_vtime(Some(Duration::from_secs(60))), (0, 255));
    }

    #[test]
    fn every_supported_baud_rate_maps() {
        for &baud in SUPPORTED_BAUD_RATES {
            assert!(baud_to_speed(baud).is_ok(), "baud {baud} should map");
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn pty_roundtrip_and_timeout() {
        use std::os::fd::FromRawFd;

        // SAFETY: plain libc pty setup; every return code is checked and the
        // master descriptor is handed to a File that owns it from then on.
        let (mut master, slave_path) = unsafe {
            let fd = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            assert!(fd >= 0, "posix_openpt failed");
            assert_eq!(libc::grantpt(fd), 0);
            assert_eq!(libc::unlockpt(fd), 0);
            let mut name = [0 as libc::c_char; 128];
            assert_eq!(libc::ptsname_r(fd, name.as_mut_ptr(), name.len()), 0);
            let path = std::ffi::CStr::from_ptr(name.as_ptr())
                .to_string_lossy()
                .into_owned();
            (File::from_raw_fd(fd), PathBuf::from(path))
        };

        let config = SerialConfig {
            read_timeout: Some(Duration::from_millis(100)),
            ..SerialConfig::default()
        };
        let mut port = SerialPort::open(&slave_path, &config).unwrap();
        assert_eq!(port.path(), slave_path.as_path());

        master.write_all(b"\x00\x01\x00").unwrap();
        let mut buf = [0u8; 3];
        port.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x00, 0x01, 0x00]);

        let err = port.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }
}

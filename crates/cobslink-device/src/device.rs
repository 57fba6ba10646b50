use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use cobslink_frame::{ErrorKind, FrameConfig, FrameError, FrameReader, FrameWriter, Message};
use cobslink_transport::LinkStream;
use tracing::{debug, info, warn};

use crate::client::split_link;
use crate::error::Result;
use crate::responder::Responder;

/// Pause between decoding a request and writing its reply.
pub const DEFAULT_RESPONSE_DELAY: Duration = Duration::from_millis(500);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Mock device behaviour.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Simulated processing time before each reply.
    pub response_delay: Duration,
    /// Framing limits and link timeouts. The read timeout doubles as the
    /// interval at which the stop flag is checked.
    pub frame: FrameConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            response_delay: DEFAULT_RESPONSE_DELAY,
            frame: FrameConfig {
                read_timeout: Some(DEFAULT_POLL_INTERVAL),
                ..FrameConfig::default()
            },
        }
    }
}

/// Counters for one serve session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub received: u64,
    pub replied: u64,
    pub framing_errors: u64,
    pub integrity_errors: u64,
    pub codec_errors: u64,
}

impl SessionStats {
    /// Frames dropped without a reply.
    pub fn rejected(&self) -> u64 {
        self.framing_errors + self.integrity_errors + self.codec_errors
    }

    fn record(&mut self, err: &FrameError) {
        match err.kind() {
            ErrorKind::Framing => self.framing_errors += 1,
            ErrorKind::Integrity => self.integrity_errors += 1,
            ErrorKind::Codec => self.codec_errors += 1,
            ErrorKind::Timeout | ErrorKind::Transport => {}
        }
    }
}

/// Answers every valid request frame with one reply frame.
///
/// Frames that fail de-stuffing, checksum or decoding are logged and dropped;
/// the device never replies to them.
pub struct MockDevice<R> {
    responder: R,
    config: DeviceConfig,
}

impl<R: Responder> MockDevice<R> {
    pub fn new(responder: R) -> Self {
        Self::with_config(responder, DeviceConfig::default())
    }

    pub fn with_config(responder: R, config: DeviceConfig) -> Self {
        Self { responder, config }
    }

    /// The reply for one request, without the delay.
    pub fn handle(&mut self, request: &Message) -> Message {
        self.responder.respond(request)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn responder(&self) -> &R {
        &self.responder
    }

    /// Serve requests until the peer closes the link or `stop` is set.
    ///
    /// `stop` is checked whenever a read times out, so the reader should
    /// carry a read timeout for shutdown to be prompt.
    pub fn serve<S: Read, W: Write>(
        &mut self,
        reader: &mut FrameReader<S>,
        writer: &mut FrameWriter<W>,
        stop: &AtomicBool,
    ) -> Result<SessionStats> {
        let mut stats = SessionStats::default();

        while !stop.load(Ordering::Relaxed) {
            let request = match reader.read_message() {
                Ok(request) => request,
                Err(FrameError::Timeout) => continue,
                Err(FrameError::ConnectionClosed) => {
                    info!(?stats, "link closed by peer");
                    return Ok(stats);
                }
                Err(err) if err.is_recoverable() => {
                    warn!(kind = err.kind().as_str(), error = %err, "dropped bad frame");
                    stats.record(&err);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            stats.received += 1;
            info!(%request, "request");

            let reply = self.handle(&request);
            if !self.config.response_delay.is_zero() {
                thread::sleep(self.config.response_delay);
            }

            match writer.send(&reply) {
                Ok(()) => {
                    stats.replied += 1;
                    debug!(%reply, "reply sent");
                }
                Err(err) if err.is_recoverable() => {
                    warn!(kind = err.kind().as_str(), error = %err, "reply not sent");
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(?stats, "stop requested");
        Ok(stats)
    }

    /// Split `link` into framed halves using this device's config and serve it.
    pub fn serve_link(&mut self, link: LinkStream, stop: &AtomicBool) -> Result<SessionStats> {
        let kind = link.kind();
        let (mut reader, mut writer) = split_link(link, &self.config.frame)?;
        info!(link = kind, "serving");
        self.serve(&mut reader, &mut writer, stop)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::sync::Arc;

    use bytes::BytesMut;
    use cobslink_frame::{cobs, crc, payload, SENTINEL};

    use super::*;
    use crate::table::{CommandTable, DEFAULT_FALLBACK};

    fn fast_config() -> DeviceConfig {
        DeviceConfig {
            response_delay: Duration::ZERO,
            frame: FrameConfig {
                read_timeout: Some(Duration::from_millis(50)),
                ..FrameConfig::default()
            },
        }
    }

    fn spawn_device(
        link: LinkStream,
        stop: Arc<AtomicBool>,
    ) -> thread::JoinHandle<Result<SessionStats>> {
        thread::spawn(move || {
            let mut device = MockDevice::with_config(CommandTable::builtin(), fast_config());
            device.serve_link(link, &stop)
        })
    }

    fn host(link: LinkStream) -> (FrameReader<LinkStream>, FrameWriter<LinkStream>) {
        let config = FrameConfig {
            read_timeout: Some(Duration::from_secs(5)),
            ..FrameConfig::default()
        };
        split_link(link, &config).unwrap()
    }

    #[test]
    fn handle_uses_responder() {
        let mut device = MockDevice::new(|request: &Message| {
            Message::text(format!("echo {}", request.as_text().unwrap_or("?")))
        });
        assert_eq!(device.handle(&Message::from("hi")), Message::from("echo hi"));
    }

    #[test]
    fn answers_ping_chip() {
        let (device_side, host_side) = LinkStream::pair().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_device(device_side, stop);

        let (mut reader, mut writer) = host(host_side);
        writer.send(&Message::from("PING CHIP")).unwrap();
        assert_eq!(reader.read_message().unwrap(), Message::from("ping received"));

        writer.send(&Message::from("NOT A COMMAND")).unwrap();
        assert_eq!(reader.read_message().unwrap(), Message::from(DEFAULT_FALLBACK));

        drop(writer);
        drop(reader);
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.replied, 2);
        assert_eq!(stats.rejected(), 0);
    }

    #[test]
    fn corrupt_frame_gets_no_reply() {
        let (device_side, host_side) = LinkStream::pair().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_device(device_side, stop);

        let (mut reader, mut writer) = host(host_side);

        let mut unstuffed = payload::encode_to_vec(&Message::from("START")).unwrap();
        let crc = crc::checksum(&unstuffed) ^ 0x0000_00FF;
        unstuffed.extend_from_slice(&crc.to_be_bytes());
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&[SENTINEL]);
        cobs::encode(&unstuffed, &mut wire);
        wire.extend_from_slice(&[SENTINEL]);
        writer.get_mut().write_all(&wire).unwrap();
        // not COBS at all: code byte overruns the frame
        writer.get_mut().write_all(&[0x00, 0x09, 0x41, 0x00]).unwrap();

        writer.send(&Message::from("GET 5V")).unwrap();
        assert_eq!(reader.read_message().unwrap(), Message::from("5"));

        drop(writer);
        drop(reader);
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.received, 1);
        assert_eq!(stats.replied, 1);
        assert_eq!(stats.rejected(), 2);
        assert_eq!(stats.framing_errors, 1);
        assert_eq!(stats.integrity_errors, 1);
    }

    #[test]
    fn stops_when_flag_set() {
        let (device_side, _host_side) = LinkStream::pair().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_device(device_side, Arc::clone(&stop));

        thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::Relaxed);

        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats, SessionStats::default());
    }

    #[test]
    fn response_delay_is_applied() {
        let (device_side, host_side) = LinkStream::pair().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn(move || {
            let mut config = fast_config();
            config.response_delay = Duration::from_millis(200);
            MockDevice::with_config(CommandTable::builtin(), config).serve_link(device_side, &stop)
        });

        let (mut reader, mut writer) = host(host_side);
        let started = std::time::Instant::now();
        writer.send(&Message::from("GET 3V")).unwrap();
        assert_eq!(reader.read_message().unwrap(), Message::from("3.3"));
        assert!(started.elapsed() >= Duration::from_millis(200));

        drop(writer);
        drop(reader);
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn stats_classify_errors() {
        let mut stats = SessionStats::default();
        stats.record(&FrameError::Truncated { len: 2 });
        stats.record(&FrameError::ChecksumMismatch {
            expected: 1,
            computed: 2,
        });
        stats.record(&FrameError::Codec(cobslink_frame::CodecError::TrailingBytes(1)));
        stats.record(&FrameError::Timeout);
        assert_eq!(stats.framing_errors, 1);
        assert_eq!(stats.integrity_errors, 1);
        assert_eq!(stats.codec_errors, 1);
        assert_eq!(stats.rejected(), 3);
    }
}

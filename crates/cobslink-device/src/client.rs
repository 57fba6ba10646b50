use std::io::{Read, Write};
use std::time::{Duration, Instant};

use cobslink_frame::{FrameConfig, FrameError, FrameReader, FrameWriter, Message};
use cobslink_transport::LinkStream;
use tracing::{debug, warn};

use crate::error::{DeviceError, Result};

/// Split a link into a framed reader and writer sharing one connection.
///
/// Timeouts from `config` are applied to both halves.
pub fn split_link(
    link: LinkStream,
    config: &FrameConfig,
) -> Result<(FrameReader<LinkStream>, FrameWriter<LinkStream>)> {
    let reader_stream = link.try_clone()?;
    let reader = FrameReader::with_config_link(reader_stream, config.clone())?;
    let writer = FrameWriter::with_config_link(link, config.clone())?;
    Ok((reader, writer))
}

/// Send `message` and wait up to `timeout` for the next valid reply.
///
/// Bad frames arriving in the meantime are logged and skipped. The deadline
/// is only checked between reads, so the reader's own read timeout bounds
/// how far past `timeout` this can block.
pub fn request<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    message: &Message,
    timeout: Duration,
) -> Result<Message> {
    writer.send(message)?;
    debug!(%message, "request sent");

    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() >= deadline {
            return Err(DeviceError::Timeout(timeout));
        }

        match reader.read_message() {
            Ok(reply) => return Ok(reply),
            Err(FrameError::Timeout) => continue,
            Err(FrameError::ConnectionClosed) => return Err(DeviceError::Disconnected),
            Err(err) if err.is_recoverable() => {
                warn!(kind = err.kind().as_str(), error = %err, "skipped bad reply frame");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::thread;

    use super::*;

    fn link_config(read_timeout: Duration) -> FrameConfig {
        FrameConfig {
            read_timeout: Some(read_timeout),
            ..FrameConfig::default()
        }
    }

    #[test]
    fn request_returns_reply() {
        let (host_side, device_side) = LinkStream::pair().unwrap();
        let config = link_config(Duration::from_millis(50));

        let device = thread::spawn(move || {
            let (mut reader, mut writer) =
                split_link(device_side, &link_config(Duration::from_secs(5))).unwrap();
            let got = reader.read_message().unwrap();
            assert_eq!(got, Message::from("GET MAC"));
            writer.send(&Message::from("mac: FF:02:AF:9F:4C:00")).unwrap();
        });

        let (mut reader, mut writer) = split_link(host_side, &config).unwrap();
        let reply = request(
            &mut reader,
            &mut writer,
            &Message::from("GET MAC"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(reply, Message::from("mac: FF:02:AF:9F:4C:00"));
        device.join().unwrap();
    }

    #[test]
    fn request_skips_corrupt_reply() {
        let (host_side, device_side) = LinkStream::pair().unwrap();

        let device = thread::spawn(move || {
            let (mut reader, mut writer) =
                split_link(device_side, &link_config(Duration::from_secs(5))).unwrap();
            reader.read_message().unwrap();
            // checksum-less frame: truncated
            writer.get_mut().write_all(&[0x00, 0x02, 0x61, 0x00]).unwrap();
            writer.send(&Message::Integer(7)).unwrap();
        });

        let (mut reader, mut writer) =
            split_link(host_side, &link_config(Duration::from_millis(50))).unwrap();
        let reply = request(
            &mut reader,
            &mut writer,
            &Message::from("GET 5V"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(reply, Message::Integer(7));
        device.join().unwrap();
    }

    #[test]
    fn request_times_out() {
        let (host_side, _device_side) = LinkStream::pair().unwrap();
        let (mut reader, mut writer) =
            split_link(host_side, &link_config(Duration::from_millis(20))).unwrap();

        let err = request(
            &mut reader,
            &mut writer,
            &Message::from("START"),
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert!(matches!(err, DeviceError::Timeout(d) if d == Duration::from_millis(100)));
    }

    #[test]
    fn request_reports_disconnect() {
        let (host_side, device_side) = LinkStream::pair().unwrap();
        let device = thread::spawn(move || {
            let (mut reader, writer) =
                split_link(device_side, &link_config(Duration::from_secs(5))).unwrap();
            reader.read_message().unwrap();
            drop(writer);
            drop(reader);
        });

        let (mut reader, mut writer) =
            split_link(host_side, &link_config(Duration::from_millis(50))).unwrap();
        let err = request(
            &mut reader,
            &mut writer,
            &Message::from("START"),
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(matches!(err, DeviceError::Disconnected));
        device.join().unwrap();
    }
}

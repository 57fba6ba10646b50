use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::cobs;
use crate::crc;
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::payload;

/// Frame delimiter. Never appears inside a stuffed payload.
pub const SENTINEL: u8 = 0x00;

/// Default bound on the bytes buffered between two sentinels: 64 KiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Configuration shared by [`FrameReader`](crate::FrameReader) and
/// [`FrameWriter`](crate::FrameWriter).
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum stuffed frame size, sentinels excluded. Default: 64 KiB.
    pub max_frame_size: usize,
    /// Read timeout applied to link streams.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to link streams.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Encode a message into the wire format, appending to `dst`.
///
/// ```text
/// ┌──────┬─────────────────────────────────────────────┬──────┐
/// │ 0x00 │ COBS( CBOR(message) ++ CRC32 BE (4B) )      │ 0x00 │
/// └──────┴─────────────────────────────────────────────┴──────┘
/// ```
///
/// Fails only if the message itself cannot be represented in CBOR.
pub fn encode_frame(message: &Message, dst: &mut BytesMut) -> Result<()> {
    let mut unstuffed = BytesMut::new();
    payload::encode(message, &mut unstuffed)?;
    let crc = crc::checksum(&unstuffed);
    unstuffed.put_u32(crc);

    dst.reserve(cobs::max_encoded_len(unstuffed.len()) + 2);
    dst.put_u8(SENTINEL);
    cobs::encode(&unstuffed, dst);
    dst.put_u8(SENTINEL);
    Ok(())
}

/// Unstuff a frame body and verify its checksum.
///
/// `frame` is the bytes between two sentinels. Returns the encoded message
/// bytes with the checksum trailer removed.
pub fn open_frame(frame: &[u8]) -> Result<BytesMut> {
    let mut unstuffed = BytesMut::with_capacity(frame.len());
    cobs::decode(frame, &mut unstuffed)?;

    let Some((body, expected)) = crc::split_trailer(&unstuffed) else {
        return Err(FrameError::Truncated {
            len: unstuffed.len(),
        });
    };
    if !crc::verify(body, expected) {
        return Err(FrameError::ChecksumMismatch {
            expected,
            computed: crc::checksum(body),
        });
    }

    let body_len = body.len();
    unstuffed.truncate(body_len);
    Ok(unstuffed)
}

/// Run the full receive pipeline on a frame body: unstuff, verify, decode.
pub fn decode_frame(frame: &[u8]) -> Result<Message> {
    let body = open_frame(frame)?;
    Ok(payload::decode(&body)?)
}

/// Decode every frame found in a byte slice, skipping idle markers.
///
/// Bytes after the last sentinel are an unterminated frame and are ignored.
pub fn decode_all(wire: &[u8]) -> Vec<Result<Message>> {
    let mut parts: Vec<&[u8]> = wire.split(|&b| b == SENTINEL).collect();
    parts.pop();
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(decode_frame)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CobsError, ErrorKind};

    fn frame_for(message: &Message) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_frame(message, &mut wire).unwrap();
        wire.to_vec()
    }

    fn body(wire: &[u8]) -> &[u8] {
        &wire[1..wire.len() - 1]
    }

    #[test]
    fn frame_layout() {
        let wire = frame_for(&Message::from("START"));
        assert_eq!(wire[0], SENTINEL);
        assert_eq!(*wire.last().unwrap(), SENTINEL);
        assert!(!body(&wire).contains(&SENTINEL));

        let mut expected = payload::encode_to_vec(&Message::from("START")).unwrap();
        let crc = crc::checksum(&expected);
        expected.extend_from_slice(&crc.to_be_bytes());
        let mut unstuffed = BytesMut::new();
        cobs::decode(body(&wire), &mut unstuffed).unwrap();
        assert_eq!(unstuffed.as_ref(), expected.as_slice());
    }

    #[test]
    fn roundtrip_through_pipeline() {
        let message = Message::Map(vec![(
            Message::from("GET LED brightness ON"),
            Message::Float(0.3),
        )]);
        let wire = frame_for(&message);
        assert_eq!(decode_frame(body(&wire)).unwrap(), message);
    }

    #[test]
    fn any_flipped_message_bit_fails_integrity() {
        let message = Message::from("PING CHIP");
        let encoded = payload::encode_to_vec(&message).unwrap();
        let crc = crc::checksum(&encoded);

        for byte in 0..encoded.len() {
            for bit in 0..8 {
                let mut corrupted = encoded.clone();
                corrupted[byte] ^= 1 << bit;
                corrupted.extend_from_slice(&crc.to_be_bytes());
                let mut stuffed = BytesMut::new();
                cobs::encode(&corrupted, &mut stuffed);

                let err = decode_frame(&stuffed).unwrap_err();
                assert!(
                    matches!(err, FrameError::ChecksumMismatch { .. }),
                    "flip at {byte}:{bit} gave {err}"
                );
            }
        }
    }

    #[test]
    fn mismatch_reports_stored_and_computed_checksums() {
        let encoded = payload::encode_to_vec(&Message::from("START")).unwrap();
        let good = crc::checksum(&encoded);
        let mut unstuffed = encoded.clone();
        unstuffed.extend_from_slice(&(good ^ 0xFF).to_be_bytes());
        let mut stuffed = BytesMut::new();
        cobs::encode(&unstuffed, &mut stuffed);

        let err = open_frame(&stuffed).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChecksumMismatch { expected, computed }
                if expected == good ^ 0xFF && computed == good
        ));

        let mut intact = encoded.clone();
        intact.extend_from_slice(&good.to_be_bytes());
        let mut stuffed = BytesMut::new();
        cobs::encode(&intact, &mut stuffed);
        assert_eq!(open_frame(&stuffed).unwrap().as_ref(), encoded.as_slice());
    }

    #[test]
    fn short_payload_is_truncated_not_a_crash() {
        for short in [&[][..], &[0x01u8][..], &[0x01, 0x02, 0x03][..]] {
            let mut stuffed = BytesMut::new();
            cobs::encode(short, &mut stuffed);
            let err = decode_frame(&stuffed).unwrap_err();
            assert!(matches!(err, FrameError::Truncated { len } if len == short.len()));
            assert_eq!(err.kind(), ErrorKind::Framing);
        }
    }

    #[test]
    fn bad_cobs_is_framing_error() {
        let err = decode_frame(&[0x09, 0x61]).unwrap_err();
        assert!(matches!(err, FrameError::Cobs(CobsError::Overrun { .. })));
    }

    #[test]
    fn valid_checksum_over_garbage_is_codec_error() {
        let garbage = [0x62, b'a'];
        let mut unstuffed = garbage.to_vec();
        unstuffed.extend_from_slice(&crc::checksum(&garbage).to_be_bytes());
        let mut stuffed = BytesMut::new();
        cobs::encode(&unstuffed, &mut stuffed);

        let err = decode_frame(&stuffed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
    }

    #[test]
    fn decode_all_skips_idle_markers_and_tail() {
        let mut wire = vec![0x00, 0x00];
        wire.extend(frame_for(&Message::from("GET 5V")));
        wire.extend([0x00, 0x00]);
        wire.extend(frame_for(&Message::from("GET 3V")));
        wire.extend([0x05, 0x61]);

        let results = decode_all(&wire);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &Message::from("GET 5V"));
        assert_eq!(results[1].as_ref().unwrap(), &Message::from("GET 3V"));
        assert!(decode_all(&[0x00, 0x00, 0x00]).is_empty());
    }

    #[test]
    fn encode_appends() {
        let mut wire = BytesMut::new();
        encode_frame(&Message::from("a"), &mut wire).unwrap();
        encode_frame(&Message::from("b"), &mut wire).unwrap();
        let results = decode_all(&wire);
        assert_eq!(results.len(), 2);
    }
}

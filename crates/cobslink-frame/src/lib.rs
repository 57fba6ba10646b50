//! Sentinel-delimited message framing for point-to-point serial links.
//!
//! Every message travels as:
//! - a `0x00` sentinel,
//! - the COBS-stuffed bytes of `CBOR(message) ++ CRC32(CBOR(message))`,
//! - a closing `0x00` sentinel.
//!
//! Consecutive sentinels are idle markers. A corrupt frame is reported and
//! dropped; the reader keeps going.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod cobs;
pub mod codec;
pub mod crc;
pub mod error;
pub mod message;
pub mod payload;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::SentinelCodec;
pub use codec::{
    decode_all, decode_frame, encode_frame, open_frame, FrameConfig, DEFAULT_MAX_FRAME_SIZE,
    SENTINEL,
};
pub use error::{CobsError, CodecError, ErrorKind, FrameError, Result};
pub use message::Message;
pub use reader::{FrameDecoder, FrameReader, ReaderState};
pub use writer::FrameWriter;

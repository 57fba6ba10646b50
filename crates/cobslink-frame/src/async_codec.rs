//! `tokio_util::codec` adapter for cooperative schedulers.
//!
//! Bad frames are yielded as `Ok(Some(Err(..)))` items so a `FramedRead`
//! stream keeps going; only I/O errors terminate it.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{encode_frame, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::reader::{FrameDecoder, ReaderState};

/// Sentinel-delimited message codec.
#[derive(Debug)]
pub struct SentinelCodec {
    decoder: FrameDecoder,
}

impl SentinelCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            decoder: FrameDecoder::new(max_frame_size),
        }
    }
}

impl Default for SentinelCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for SentinelCodec {
    type Item = Result<Message>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let mut consumed = 0;
        let mut closed = None;
        for &byte in src.iter() {
            consumed += 1;
            if let Some(result) = self.decoder.push(byte) {
                closed = Some(result);
                break;
            }
        }
        src.advance(consumed);
        Ok(closed)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if self.decoder.state() == ReaderState::Accumulating {
            debug!(
                buffered = self.decoder.buffered(),
                "stream closed mid-frame; partial frame dropped"
            );
        }
        self.decoder.reset();
        Ok(None)
    }
}

impl Encoder<Message> for SentinelCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&item, dst)
    }
}

impl Encoder<&Message> for SentinelCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<()> {
        encode_frame(item, dst)
    }
}

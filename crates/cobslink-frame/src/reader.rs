use std::io::{ErrorKind, Read};

use bytes::{Buf, BufMut, BytesMut};
use cobslink_transport::LinkStream;
use tracing::debug;

use crate::codec::{decode_frame, FrameConfig, SENTINEL};
use crate::error::{FrameError, Result};
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Where the decoder is relative to frame boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Nothing buffered; waiting for frame content.
    Idle,
    /// Collecting bytes until the next sentinel.
    Accumulating,
}

/// Byte-at-a-time frame delimiter with no I/O of its own.
///
/// The accumulation buffer is reused across frames and cleared at every
/// sentinel, whether the frame decoded or not.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_size: usize,
    /// Bytes seen since the buffer overflowed; zero when not overflowing.
    overflow: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY.min(max_frame_size)),
            max_frame_size,
            overflow: 0,
        }
    }

    /// Feed one byte. Returns a result only when a non-empty frame closes.
    pub fn push(&mut self, byte: u8) -> Option<Result<Message>> {
        if byte != SENTINEL {
            if self.overflow > 0 {
                self.overflow += 1;
            } else if self.buf.len() >= self.max_frame_size {
                self.overflow = self.buf.len() + 1;
                self.buf.clear();
            } else {
                self.buf.put_u8(byte);
            }
            return None;
        }

        if self.overflow > 0 {
            let size = std::mem::take(&mut self.overflow);
            debug!(size, max = self.max_frame_size, "discarded oversized frame");
            return Some(Err(FrameError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            }));
        }

        if self.buf.is_empty() {
            return None;
        }

        debug!(len = self.buf.len(), "frame boundary");
        let result = decode_frame(&self.buf);
        self.buf.clear();
        Some(result)
    }

    pub fn state(&self) -> ReaderState {
        if self.buf.is_empty() && self.overflow == 0 {
            ReaderState::Idle
        } else {
            ReaderState::Accumulating
        }
    }

    /// Bytes held for the frame in progress.
    pub fn buffered(&self) -> usize {
        self.buf.len().max(self.overflow)
    }

    /// Drop any partial frame and return to [`ReaderState::Idle`].
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflow = 0;
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = max_frame_size;
    }
}

/// Reads sentinel-delimited frames from any `Read` stream.
///
/// Bad frames come back as recoverable errors and the reader stays usable;
/// see [`FrameError::is_recoverable`].
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    /// Bytes read from `inner` but not yet fed to the decoder.
    pending: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(config.max_frame_size),
            pending: BytesMut::with_capacity(READ_CHUNK_SIZE),
            config,
        }
    }

    /// Read until the next non-empty frame closes and return its message.
    ///
    /// - A malformed frame returns its framing, integrity or codec error.
    /// - A read timeout returns [`FrameError::Timeout`]; the partial frame
    ///   is kept for the next call.
    /// - End of stream returns [`FrameError::ConnectionClosed`] and drops
    ///   any partial frame.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            let mut consumed = 0;
            let mut closed = None;
            for &byte in self.pending.iter() {
                consumed += 1;
                if let Some(result) = self.decoder.push(byte) {
                    closed = Some(result);
                    break;
                }
            }
            self.pending.advance(consumed);
            if let Some(result) = closed {
                return result;
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(FrameError::Timeout)
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.decoder.state() == ReaderState::Accumulating {
                    debug!(
                        buffered = self.decoder.buffered(),
                        "stream closed mid-frame; partial frame dropped"
                    );
                }
                self.decoder.reset();
                return Err(FrameError::ConnectionClosed);
            }

            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    /// Current decoder state.
    pub fn state(&self) -> ReaderState {
        self.decoder.state()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Bytes already read but not yet decoded are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum frame size for subsequent frames.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
        self.decoder.set_max_frame_size(max_frame_size);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<LinkStream> {
    /// Create a frame reader for `LinkStream` and apply read timeout from config.
    pub fn with_config_link(inner: LinkStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

//! Message framing for point-to-point serial links.
//!
//! Each message is CBOR-encoded, followed by a big-endian CRC32, COBS-stuffed
//! and wrapped in `0x00` sentinels.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial ports and Unix sockets behind one `LinkStream`
//! - [`frame`]: the codec, reader and writer
//! - [`device`]: mock device and request client (behind `device` feature)

/// Re-export transport types.
pub mod transport {
    pub use cobslink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cobslink_frame::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use cobslink_device::*;
}

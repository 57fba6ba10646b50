//! Duplex byte streams for cobslink.
//!
//! The framing layer only needs "read some bytes, write a buffer" with
//! blocking-with-timeout semantics. This crate provides that over:
//! - Serial TTYs (raw termios, configurable baud rate)
//! - Unix domain sockets (host-side simulation and tests)
//!
//! Everything else builds on top of the [`LinkStream`] type provided here.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::LinkStream;

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort, DEFAULT_BAUD_RATE, SUPPORTED_BAUD_RATES};
#[cfg(unix)]
pub use uds::UnixDomainSocket;

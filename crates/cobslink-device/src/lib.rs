//! The application side of a cobslink link.
//!
//! A [`MockDevice`] answers each decoded request through a [`Responder`]
//! (usually a [`CommandTable`]) and writes the reply back, one frame at a
//! time. [`request`] is the matching host-side call.

pub mod client;
pub mod device;
pub mod error;
pub mod json;
pub mod responder;
pub mod table;

pub use client::{request, split_link};
pub use device::{DeviceConfig, MockDevice, SessionStats, DEFAULT_RESPONSE_DELAY};
pub use error::{DeviceError, Result};
pub use responder::Responder;
pub use table::{CommandTable, DEFAULT_FALLBACK};

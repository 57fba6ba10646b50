//! IEEE 802.3 CRC32 over the encoded message bytes.
//!
//! Reflected polynomial `0xEDB88320`, init and final XOR `0xFFFFFFFF`, the
//! same checksum zlib and most serial tooling compute. Stored big-endian.

/// Width of the checksum trailer in bytes.
pub const CHECKSUM_SIZE: usize = 4;

pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn verify(data: &[u8], expected: u32) -> bool {
    checksum(data) == expected
}

/// Split an unstuffed payload into `(message bytes, stored checksum)`.
///
/// Returns `None` when the payload is shorter than the trailer.
pub fn split_trailer(payload: &[u8]) -> Option<(&[u8], u32)> {
    let body_len = payload.len().checked_sub(CHECKSUM_SIZE)?;
    let (body, trailer) = payload.split_at(body_len);
    let stored = u32::from_be_bytes(trailer.try_into().ok()?);
    Some((body, stored))
}

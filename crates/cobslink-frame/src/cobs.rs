//! Consistent Overhead Byte Stuffing.
//!
//! Removes every `0x00` from a payload so the zero byte can delimit frames.
//! Each run of up to 254 non-zero bytes is prefixed by a code byte holding
//! the run length plus one. A code of `0xFF` marks a full run with no
//! implicit zero after it.

use bytes::{BufMut, BytesMut};

use crate::error::CobsError;

const MAX_CODE: u8 = 0xFF;

/// Worst-case stuffed length for `len` input bytes.
pub fn max_encoded_len(len: usize) -> usize {
    len + len / 254 + 1
}

/// Stuff `src`, appending to `dst`. The output never contains `0x00`.
///
/// An empty input encodes to the single byte `0x01`.
pub fn encode(src: &[u8], dst: &mut BytesMut) {
    dst.reserve(max_encoded_len(src.len()));

    let mut code_idx = dst.len();
    dst.put_u8(0);
    let mut code = 1u8;

    for &byte in src {
        if byte == 0 {
            dst[code_idx] = code;
            code_idx = dst.len();
            dst.put_u8(0);
            code = 1;
            continue;
        }

        dst.put_u8(byte);
        code += 1;
        if code == MAX_CODE {
            dst[code_idx] = code;
            code_idx = dst.len();
            dst.put_u8(0);
            code = 1;
        }
    }

    dst[code_idx] = code;
}

/// Unstuff `src`, appending the original bytes to `dst`.
///
/// On error `dst` may hold a partial result; callers discard it.
pub fn decode(src: &[u8], dst: &mut BytesMut) -> Result<(), CobsError> {
    if src.is_empty() {
        return Err(CobsError::Empty);
    }
    dst.reserve(src.len());

    let mut idx = 0;
    while idx < src.len() {
        let code = src[idx];
        if code == 0 {
            return Err(CobsError::ZeroByte { offset: idx });
        }

        let start = idx + 1;
        let end = start + code as usize - 1;
        if end > src.len() {
            return Err(CobsError::Overrun {
                offset: idx,
                code,
                needed: code as usize - 1,
                available: src.len() - start,
            });
        }

        let run = &src[start..end];
        if let Some(pos) = run.iter().position(|&b| b == 0) {
            return Err(CobsError::ZeroByte { offset: start + pos });
        }
        dst.put_slice(run);

        idx = end;
        if code != MAX_CODE && idx < src.len() {
            dst.put_u8(0);
        }
    }

    Ok(())
}

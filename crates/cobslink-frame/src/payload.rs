//! Structured payload codec (CBOR via `ciborium`).

use bytes::{BufMut, BytesMut};
use ciborium::value::{Integer, Value};

use crate::error::CodecError;
use crate::message::Message;

const TAG_POSITIVE_BIGNUM: u64 = 2;
const TAG_NEGATIVE_BIGNUM: u64 = 3;
/// Bignum byte strings up to this length are read back as integers.
const BIGNUM_INLINE_LEN: usize = 16;

/// Serialize `message` as one CBOR item, appending to `dst`.
pub fn encode(message: &Message, dst: &mut BytesMut) -> Result<(), CodecError> {
    let value = to_value(message)?;
    ciborium::into_writer(&value, dst.writer()).map_err(|err| CodecError::Encode(err.to_string()))
}

pub fn encode_to_vec(message: &Message) -> Result<Vec<u8>, CodecError> {
    let mut buf = BytesMut::new();
    encode(message, &mut buf)?;
    Ok(buf.to_vec())
}

/// Parse exactly one CBOR item from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    let mut rest = bytes;
    let value: Value =
        ciborium::from_reader(&mut rest).map_err(|err| CodecError::Decode(err.to_string()))?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes(rest.len()));
    }
    from_value(value)
}

fn to_value(message: &Message) -> Result<Value, CodecError> {
    let value = match message {
        Message::Null => Value::Null,
        Message::Bool(value) => Value::Bool(*value),
        Message::Integer(value) => Value::Integer(
            Integer::try_from(*value).map_err(|_| CodecError::IntegerOutOfRange(*value))?,
        ),
        Message::Float(value) => Value::Float(*value),
        Message::Text(text) => Value::Text(text.clone()),
        Message::Bytes(bytes) => Value::Bytes(bytes.clone()),
        Message::Array(items) => Value::Array(items.iter().map(to_value).collect::<Result<_, _>>()?),
        Message::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((to_value(k)?, to_value(v)?)))
                .collect::<Result<_, CodecError>>()?,
        ),
        Message::Tag(tag, inner) => {
            check_bignum(*tag, inner)?;
            Value::Tag(*tag, Box::new(to_value(inner)?))
        }
    };
    Ok(value)
}

/// Reject bignum tags that the decoder would not hand back unchanged.
///
/// A byte string of up to 16 bytes under tag 2 or 3 is decoded as a number:
/// leading zeros are dropped and anything in the integer range becomes
/// `Message::Integer`. Only minimal encodings above that range survive,
/// and a 16-byte negative bignum must also fit in `i128`.
fn check_bignum(tag: u64, inner: &Message) -> Result<(), CodecError> {
    if tag != TAG_POSITIVE_BIGNUM && tag != TAG_NEGATIVE_BIGNUM {
        return Ok(());
    }
    let Message::Bytes(bytes) = inner else {
        return Ok(());
    };
    if bytes.len() > BIGNUM_INLINE_LEN {
        return Ok(());
    }

    let minimal = bytes.first().is_some_and(|&b| b != 0);
    let above_integer_range = bytes.len() > 8;
    let fits_i128 = !(tag == TAG_NEGATIVE_BIGNUM
        && bytes.len() == BIGNUM_INLINE_LEN
        && bytes[0] >= 0x80);
    if minimal && above_integer_range && fits_i128 {
        return Ok(());
    }
    Err(CodecError::NonCanonicalBignum {
        tag,
        len: bytes.len(),
    })
}

fn from_value(value: Value) -> Result<Message, CodecError> {
    let message = match value {
        Value::Null => Message::Null,
        Value::Bool(value) => Message::Bool(value),
        Value::Integer(value) => Message::Integer(i128::from(value)),
        Value::Float(value) => Message::Float(value),
        Value::Text(text) => Message::Text(text),
        Value::Bytes(bytes) => Message::Bytes(bytes),
        Value::Array(items) => {
            Message::Array(items.into_iter().map(from_value).collect::<Result<_, _>>()?)
        }
        Value::Map(entries) => Message::Map(
            entries
                .into_iter()
                .map(|(k, v)| Ok((from_value(k)?, from_value(v)?)))
                .collect::<Result<_, CodecError>>()?,
        ),
        Value::Tag(tag, inner) => Message::Tag(tag, Box::new(from_value(*inner)?)),
        other => {
            return Err(CodecError::Decode(format!(
                "unsupported CBOR value: {other:?}"
            )))
        }
    };
    Ok(message)
}

use std::fmt;

/// A decoded application message.
///
/// Mirrors the CBOR data model so any well-formed payload round-trips.
/// Maps keep wire order; lookups by key are linear.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Null,
    Bool(bool),
    /// CBOR integers span -2^64 ..= 2^64-1, hence the wide type.
    Integer(i128),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Message>),
    Map(Vec<(Message, Message)>),
    Tag(u64, Box<Message>),
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Message::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Look up a text key in a map message.
    pub fn get(&self, key: &str) -> Option<&Message> {
        match self {
            Message::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Short name of the variant, for logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Null => "null",
            Message::Bool(_) => "bool",
            Message::Integer(_) => "integer",
            Message::Float(_) => "float",
            Message::Text(_) => "text",
            Message::Bytes(_) => "bytes",
            Message::Array(_) => "array",
            Message::Map(_) => "map",
            Message::Tag(..) => "tag",
        }
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Text(value.to_string())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Text(value)
    }
}

impl From<bool> for Message {
    fn from(value: bool) -> Self {
        Message::Bool(value)
    }
}

impl From<i64> for Message {
    fn from(value: i64) -> Self {
        Message::Integer(value.into())
    }
}

impl From<u64> for Message {
    fn from(value: u64) -> Self {
        Message::Integer(value.into())
    }
}

impl From<f64> for Message {
    fn from(value: f64) -> Self {
        Message::Float(value)
    }
}

impl From<Vec<u8>> for Message {
    fn from(value: Vec<u8>) -> Self {
        Message::Bytes(value)
    }
}

impl From<Vec<Message>> for Message {
    fn from(value: Vec<Message>) -> Self {
        Message::Array(value)
    }
}

/// CBOR diagnostic-style rendering: `"text"`, `h'00ff'`, `[1, 2]`, `{"k": 1}`.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Null => f.write_str("null"),
            Message::Bool(value) => write!(f, "{value}"),
            Message::Integer(value) => write!(f, "{value}"),
            Message::Float(value) => write!(f, "{value:?}"),
            Message::Text(text) => write!(f, "{text:?}"),
            Message::Bytes(bytes) => {
                f.write_str("h'")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
            Message::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Message::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Message::Tag(tag, inner) => write!(f, "{tag}({inner})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_diagnostic_notation() {
        let message = Message::Map(vec![
            (Message::from("cmd"), Message::from("GET MAC")),
            (Message::Integer(0), Message::Array(vec![Message::from(24i64)])),
            (Message::from("raw"), Message::Bytes(vec![0x00, 0xff])),
            (Message::from("t"), Message::Tag(1, Box::new(Message::Float(1.5)))),
            (Message::Null, Message::Bool(true)),
        ]);
        assert_eq!(
            message.to_string(),
            r#"{"cmd": "GET MAC", 0: [24], "raw": h'00ff', "t": 1(1.5), null: true}"#
        );
    }

    #[test]
    fn get_finds_text_keys_only() {
        let message = Message::Map(vec![
            (Message::Integer(1), Message::from("one")),
            (Message::from("rssi"), Message::from(-50i64)),
        ]);
        assert_eq!(message.get("rssi").and_then(Message::as_integer), Some(-50));
        assert!(message.get("1").is_none());
        assert!(Message::from("rssi").get("rssi").is_none());
    }

    #[test]
    fn accessors_and_type_names() {
        assert_eq!(Message::text("START").as_text(), Some("START"));
        assert_eq!(Message::Integer(3).as_text(), None);
        assert_eq!(Message::Bytes(vec![]).type_name(), "bytes");
        assert_eq!(Message::Tag(0, Box::new(Message::Null)).type_name(), "tag");
    }
}

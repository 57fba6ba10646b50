//! JSON views of [`Message`] for command tables and console output.
//!
//! JSON cannot carry every CBOR shape, so the mapping to JSON is lossy:
//! byte strings become hex text, non-text map keys turn the map into an
//! array of `[key, value]` pairs, and tags become `{"tag": n, "value": v}`.

use cobslink_frame::Message;
use serde_json::{Map, Number, Value};

pub fn message_from_json(value: &Value) -> Message {
    match value {
        Value::Null => Message::Null,
        Value::Bool(value) => Message::Bool(*value),
        Value::Number(number) => number_to_message(number),
        Value::String(text) => Message::Text(text.clone()),
        Value::Array(items) => Message::Array(items.iter().map(message_from_json).collect()),
        Value::Object(entries) => Message::Map(
            entries
                .iter()
                .map(|(k, v)| (Message::Text(k.clone()), message_from_json(v)))
                .collect(),
        ),
    }
}

fn number_to_message(number: &Number) -> Message {
    if let Some(value) = number.as_i64() {
        Message::Integer(value.into())
    } else if let Some(value) = number.as_u64() {
        Message::Integer(value.into())
    } else {
        number.as_f64().map(Message::Float).unwrap_or(Message::Null)
    }
}

pub fn message_to_json(message: &Message) -> Value {
    match message {
        Message::Null => Value::Null,
        Message::Bool(value) => Value::Bool(*value),
        Message::Integer(value) => integer_to_json(*value),
        Message::Float(value) => Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Message::Text(text) => Value::String(text.clone()),
        Message::Bytes(bytes) => Value::String(hex::encode(bytes)),
        Message::Array(items) => Value::Array(items.iter().map(message_to_json).collect()),
        Message::Map(entries) => {
            if entries.iter().all(|(k, _)| k.as_text().is_some()) {
                let mut object = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    if let Some(key) = key.as_text() {
                        object.insert(key.to_string(), message_to_json(value));
                    }
                }
                Value::Object(object)
            } else {
                Value::Array(
                    entries
                        .iter()
                        .map(|(k, v)| Value::Array(vec![message_to_json(k), message_to_json(v)]))
                        .collect(),
                )
            }
        }
        Message::Tag(tag, inner) => serde_json::json!({
            "tag": tag,
            "value": message_to_json(inner),
        }),
    }
}

fn integer_to_json(value: i128) -> Value {
    if let Ok(small) = i64::try_from(value) {
        Value::from(small)
    } else if let Ok(unsigned) = u64::try_from(value) {
        Value::from(unsigned)
    } else {
        Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_to_message() {
        let value = json!({"cmd": "SET VOLTAGE", "volts": 5, "amps": 0.5, "on": true, "x": null, "l": [1]});
        let message = message_from_json(&value);
        assert_eq!(message.get("cmd"), Some(&Message::from("SET VOLTAGE")));
        assert_eq!(message.get("volts"), Some(&Message::Integer(5)));
        assert_eq!(message.get("amps"), Some(&Message::Float(0.5)));
        assert_eq!(message.get("on"), Some(&Message::Bool(true)));
        assert_eq!(message.get("x"), Some(&Message::Null));
        assert_eq!(
            message.get("l"),
            Some(&Message::Array(vec![Message::Integer(1)]))
        );
        assert_eq!(
            message_from_json(&json!(u64::MAX)),
            Message::Integer(u64::MAX as i128)
        );
    }

    #[test]
    fn message_to_json_lossy_cases() {
        assert_eq!(message_to_json(&Message::Bytes(vec![0x00, 0xAB])), json!("00ab"));
        assert_eq!(
            message_to_json(&Message::Integer(-(1i128 << 64))),
            json!("-18446744073709551616")
        );
        assert_eq!(message_to_json(&Message::Float(f64::NAN)), Value::Null);
        assert_eq!(
            message_to_json(&Message::Map(vec![(
                Message::Integer(0),
                Message::Array(vec![Message::Integer(24)])
            )])),
            json!([[0, [24]]])
        );
        assert_eq!(
            message_to_json(&Message::Tag(1, Box::new(Message::Integer(5)))),
            json!({"tag": 1, "value": 5})
        );
    }

    #[test]
    fn object_key_order_is_kept() {
        let value: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let Message::Map(entries) = message_from_json(&value) else {
            panic!("expected map");
        };
        let keys: Vec<_> = entries.iter().filter_map(|(k, _)| k.as_text()).collect();
        assert_eq!(keys, ["z", "a", "m"]);

        let back = message_to_json(&Message::Map(entries));
        assert_eq!(serde_json::to_string(&back).unwrap(), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn text_maps_become_objects() {
        let message = Message::Map(vec![(Message::from("rssi"), Message::Integer(-50))]);
        assert_eq!(message_to_json(&message), json!({"rssi": -50}));
        assert_eq!(message_from_json(&message_to_json(&message)), message);
    }
}

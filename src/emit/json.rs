//! JSON emitter.
//!
//! Dictionaries are already stored in ascending key order (the
//! `BTreeMap` backing [`Value::Dict`]), so no sort pass is needed
//! before serialization. Byte strings that are not valid UTF-8 cannot
//! be represented in JSON and are a hard failure.
use crate::bencode::Value;

use super::EmitError;

/// Serializes `value` as JSON text.
pub fn to_json(value: &Value) -> Result<String, EmitError> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) -> Result<(), EmitError> {
    match value {
        Value::Bytes(b) => write_string(b, out),
        Value::Integer(i) => {
            out.push_str(&i.to_string());
            Ok(())
        }
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
            Ok(())
        }
        Value::Dict(map) => {
            out.push('{');
            for (i, (key, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out)?;
                out.push(':');
                write_value(val, out)?;
            }
            out.push('}');
            Ok(())
        }
    }
}

fn write_string(bytes: &[u8], out: &mut String) -> Result<(), EmitError> {
    let text = std::str::from_utf8(bytes).map_err(|_| EmitError::NotUtf8)?;
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            c => {
                // non-ASCII code points are escaped, using a surrogate
                // pair for anything outside the basic multilingual plane
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{unit:04x}"));
                }
            }
        }
    }
    out.push('"');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn emits_scalars() {
        assert_eq!(to_json(&Value::Integer(42)).unwrap(), "42");
        assert_eq!(to_json(&Value::Bytes(b"hi".to_vec())).unwrap(), "\"hi\"");
    }

    #[test]
    fn emits_list_as_array() {
        let value = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(to_json(&value).unwrap(), "[1,2]");
    }

    #[test]
    fn emits_dict_with_sorted_keys() {
        let mut map = BTreeMap::new();
        map.insert(b"b".to_vec(), Value::Integer(2));
        map.insert(b"a".to_vec(), Value::Integer(1));
        let value = Value::Dict(map);
        assert_eq!(to_json(&value).unwrap(), "{\"a\":1,\"b\":2}");
    }

    #[test]
    fn escapes_control_characters() {
        let value = Value::Bytes(b"a\nb\tc".to_vec());
        assert_eq!(to_json(&value).unwrap(), "\"a\\nb\\tc\"");
    }

    #[test]
    fn rejects_non_utf8_byte_strings() {
        let value = Value::Bytes(vec![0xff, 0xfe]);
        assert_eq!(to_json(&value), Err(EmitError::NotUtf8));
    }

    #[test]
    fn escapes_non_ascii_code_points() {
        let value = Value::Bytes("é".as_bytes().to_vec());
        assert_eq!(to_json(&value).unwrap(), "\"\\u00e9\"");
    }
}

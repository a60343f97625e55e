//! Atom emitter: the tree editor's raw, non-JSON output mode.
use chrono::{TimeZone, Utc};

use crate::bencode::Value;

use super::EmitError;

/// Emits a single scalar value as raw bytes, with no trailing newline.
///
/// A byte string is emitted verbatim. An integer is emitted in
/// decimal, or (when `as_timestamp` is set) formatted as an ISO-8601
/// UTC timestamp interpreted as Unix seconds. Any other value is a
/// hard failure.
pub fn emit_atom(value: &Value, as_timestamp: bool) -> Result<Vec<u8>, EmitError> {
    match value {
        Value::Bytes(b) => Ok(b.clone()),
        Value::Integer(i) if as_timestamp => {
            let datetime = Utc.timestamp_opt(*i, 0).single().ok_or(EmitError::NotAnAtom)?;
            Ok(datetime.format("%Y-%m-%dT%H:%M:%S").to_string().into_bytes())
        }
        Value::Integer(i) => Ok(i.to_string().into_bytes()),
        Value::List(_) | Value::Dict(_) => Err(EmitError::NotAnAtom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_byte_string_raw() {
        assert_eq!(emit_atom(&Value::Bytes(b"hi".to_vec()), false).unwrap(), b"hi");
    }

    #[test]
    fn emits_integer_decimal() {
        assert_eq!(emit_atom(&Value::Integer(42), false).unwrap(), b"42");
    }

    #[test]
    fn emits_integer_as_timestamp() {
        let rendered = emit_atom(&Value::Integer(0), true).unwrap();
        assert_eq!(rendered, b"1970-01-01T00:00:00");
    }

    #[test]
    fn rejects_list_and_dict() {
        assert!(emit_atom(&Value::List(vec![]), false).is_err());
        assert!(emit_atom(&Value::Dict(Default::default()), false).is_err());
    }
}

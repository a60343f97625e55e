//! The canonical bencode encoder. Always produces the unique canonical
//! encoding of a [`Value`]; ascending dictionary key order falls out
//! of `BTreeMap`'s iteration order.
use std::io::{self, Write};

use tracing::instrument;

use super::Value;

/// Encodes `value` into a freshly allocated byte vector.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(&mut buf, value).expect("writing to a Vec<u8> cannot fail");
    buf
}

/// Encodes `value` into `writer`, propagating any I/O error.
#[instrument(skip(writer, value), level = "debug")]
pub fn encode_into<W: Write>(writer: &mut W, value: &Value) -> io::Result<()> {
    match value {
        Value::Bytes(b) => encode_string(writer, b),
        Value::Integer(i) => encode_integer(writer, *i),
        Value::List(items) => encode_list(writer, items),
        Value::Dict(map) => encode_dict(writer, map),
    }
}

#[instrument(skip(writer, s), level = "trace")]
fn encode_string<W: Write>(writer: &mut W, s: &[u8]) -> io::Result<()> {
    write!(writer, "{}:", s.len())?;
    writer.write_all(s)
}

#[instrument(skip(writer), level = "trace")]
fn encode_integer<W: Write>(writer: &mut W, i: i64) -> io::Result<()> {
    write!(writer, "i{}e", i)
}

#[instrument(skip(writer, list), level = "trace")]
fn encode_list<W: Write>(writer: &mut W, list: &[Value]) -> io::Result<()> {
    writer.write_all(b"l")?;
    for item in list {
        encode_into(writer, item)?;
    }
    writer.write_all(b"e")
}

#[instrument(skip(writer, dict), level = "trace")]
fn encode_dict<W: Write>(
    writer: &mut W,
    dict: &std::collections::BTreeMap<Vec<u8>, Value>,
) -> io::Result<()> {
    writer.write_all(b"d")?;
    for (key, value) in dict {
        encode_string(writer, key)?;
        encode_into(writer, value)?;
    }
    writer.write_all(b"e")
}

#[cfg(test)]
mod tests {
    use super::super::decode::decode;
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn round_trip_identity() {
        let input: &[u8] = b"d3:cow3:moo4:spam4:eggse";
        let value = decode(input).unwrap();
        assert_eq!(encode(&value), input);
    }

    #[test]
    fn encode_canonical_key_order() {
        let mut map = BTreeMap::new();
        map.insert(b"spam".to_vec(), Value::Bytes(b"eggs".to_vec()));
        map.insert(b"cow".to_vec(), Value::Bytes(b"moo".to_vec()));
        let value = Value::Dict(map);
        assert_eq!(encode(&value), b"d3:cow3:moo4:spam4:eggse");
    }

    #[test]
    fn structural_round_trip() {
        let mut map = BTreeMap::new();
        map.insert(b"a".to_vec(), Value::Integer(1));
        map.insert(b"b".to_vec(), Value::List(vec![Value::Bytes(b"x".to_vec())]));
        let value = Value::Dict(map);
        let bytes = encode(&value);
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn encode_empty_values() {
        assert_eq!(encode(&Value::Bytes(vec![])), b"0:");
        assert_eq!(encode(&Value::Integer(0)), b"i0e");
        assert_eq!(encode(&Value::List(vec![])), b"le");
        assert_eq!(encode(&Value::Dict(BTreeMap::new())), b"de");
    }
}

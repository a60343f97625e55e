//! The canonical bencode decoder.
//!
//! The decoder is total: every deviation from the grammar in the spec
//! is a failure, never a silent recovery. It must also consume the
//! entire input, a trailing byte after a complete value is rejected.
use std::collections::BTreeMap;

use tracing::instrument;

use super::{DecodeError, DecodeResult, Value};

/// Decodes a single bencoded value from `input`, requiring the decoder
/// to consume every byte.
#[instrument(skip(input), level = "debug")]
pub fn decode(input: &[u8]) -> DecodeResult<Value> {
    let mut d = Decoder { input, pos: 0 };
    let value = d.decode_value()?;
    if d.pos != d.input.len() {
        return Err(DecodeError::TrailingBytes { offset: d.pos });
    }
    Ok(value)
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn peek(&self, expected: &'static str) -> DecodeResult<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof {
                offset: self.pos,
                expected,
            })
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> DecodeResult<()> {
        match self.input.get(self.pos) {
            Some(&b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(&b) => Err(DecodeError::UnexpectedByte {
                offset: self.pos,
                byte: b,
                expected,
            }),
            None => Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                expected,
            }),
        }
    }

    #[instrument(skip(self), level = "trace")]
    fn decode_value(&mut self) -> DecodeResult<Value> {
        match self.peek("one of 'i', 'l', 'd', or a digit")? {
            b'i' => self.decode_integer().map(Value::Integer),
            b'l' => self.decode_list().map(Value::List),
            b'd' => self.decode_dict().map(Value::Dict),
            b'0'..=b'9' => self.decode_string().map(Value::Bytes),
            byte => Err(DecodeError::UnexpectedByte {
                offset: self.pos,
                byte,
                expected: "one of 'i', 'l', 'd', or a digit",
            }),
        }
    }

    /// Byte string: `<len>:<bytes>`, no leading zero in `<len>` unless
    /// it is exactly `0`.
    #[instrument(skip(self), level = "trace")]
    fn decode_string(&mut self) -> DecodeResult<Vec<u8>> {
        let len_start = self.pos;
        while matches!(self.input.get(self.pos), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.pos == len_start {
            return Err(DecodeError::UnexpectedByte {
                offset: self.pos,
                byte: self.peek("a digit").unwrap_or(0),
                expected: "a digit",
            });
        }
        let len_bytes = &self.input[len_start..self.pos];
        if len_bytes.len() > 1 && len_bytes[0] == b'0' {
            return Err(DecodeError::NonCanonicalInteger {
                offset: len_start,
                reason: "string length has a leading zero",
            });
        }
        self.expect(b':', ":")?;

        let length: usize = std::str::from_utf8(len_bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(DecodeError::InvalidIntegerLiteral { offset: len_start })?;

        let end = self
            .pos
            .checked_add(length)
            .filter(|&end| end <= self.input.len())
            .ok_or(DecodeError::StringLengthOverrun { offset: self.pos })?;

        let bytes = self.input[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    /// Integer: `i<canonical decimal>e`. Rejects `+`, leading zeros, and `-0`.
    #[instrument(skip(self), level = "trace")]
    fn decode_integer(&mut self) -> DecodeResult<i64> {
        self.expect(b'i', "'i'")?;
        let start = self.pos;

        let negative = self.input.get(self.pos) == Some(&b'-');
        if negative {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.input.get(self.pos), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let digits = &self.input[digits_start..self.pos];
        if digits.is_empty() {
            return Err(DecodeError::InvalidIntegerLiteral { offset: start });
        }
        if digits.len() > 1 && digits[0] == b'0' {
            return Err(DecodeError::NonCanonicalInteger {
                offset: start,
                reason: "leading zero",
            });
        }
        if negative && digits == b"0" {
            return Err(DecodeError::NonCanonicalInteger {
                offset: start,
                reason: "negative zero",
            });
        }

        let text = &self.input[start..self.pos];
        self.expect(b'e', "'e'")?;

        std::str::from_utf8(text)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(DecodeError::InvalidIntegerLiteral { offset: start })
    }

    /// List: `l<values>e`.
    #[instrument(skip(self), level = "trace")]
    fn decode_list(&mut self) -> DecodeResult<Vec<Value>> {
        self.expect(b'l', "'l'")?;
        let mut items = Vec::new();
        loop {
            if self.peek("'e' or a value")? == b'e' {
                self.pos += 1;
                break;
            }
            items.push(self.decode_value()?);
        }
        Ok(items)
    }

    /// Dictionary: `d<key value>*e`, keys strictly ascending.
    #[instrument(skip(self), level = "trace")]
    fn decode_dict(&mut self) -> DecodeResult<BTreeMap<Vec<u8>, Value>> {
        self.expect(b'd', "'d'")?;
        let mut map = BTreeMap::new();
        let mut prev_key: Option<Vec<u8>> = None;

        loop {
            if self.peek("'e' or a key")? == b'e' {
                self.pos += 1;
                break;
            }
            let key_offset = self.pos;
            if !matches!(self.peek("a byte string key")?, b'0'..=b'9') {
                return Err(DecodeError::DictKeyNotString { offset: key_offset });
            }
            let key = self.decode_string()?;
            if let Some(prev) = &prev_key {
                if key <= *prev {
                    return Err(DecodeError::DictKeyOrder { offset: key_offset });
                }
            }
            let value = self.decode_value()?;
            map.insert(key.clone(), value);
            prev_key = Some(key);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &[u8]) -> Value {
        Value::Bytes(s.to_vec())
    }

    #[test]
    fn decode_empty_string() {
        assert_eq!(decode(b"0:").unwrap(), bytes(b""));
    }

    #[test]
    fn decode_string() {
        assert_eq!(decode(b"4:spam").unwrap(), bytes(b"spam"));
    }

    #[test]
    fn decode_positive_integer() {
        assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
    }

    #[test]
    fn decode_zero() {
        assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
    }

    #[test]
    fn decode_negative_integer() {
        assert_eq!(decode(b"i-42e").unwrap(), Value::Integer(-42));
    }

    #[test]
    fn reject_leading_zero_integer() {
        assert!(matches!(
            decode(b"i03e"),
            Err(DecodeError::NonCanonicalInteger { .. })
        ));
    }

    #[test]
    fn reject_negative_zero() {
        assert!(matches!(
            decode(b"i-0e"),
            Err(DecodeError::NonCanonicalInteger { .. })
        ));
    }

    #[test]
    fn reject_plus_sign() {
        assert!(decode(b"i+1e").is_err());
    }

    #[test]
    fn decode_list() {
        assert_eq!(
            decode(b"li42ei-1ee").unwrap(),
            Value::List(vec![Value::Integer(42), Value::Integer(-1)])
        );
    }

    #[test]
    fn decode_empty_list() {
        assert_eq!(decode(b"le").unwrap(), Value::List(vec![]));
    }

    #[test]
    fn decode_dict() {
        let value = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
        match value {
            Value::Dict(map) => {
                assert_eq!(map.get(b"cow".as_slice()), Some(&bytes(b"moo")));
                assert_eq!(map.get(b"spam".as_slice()), Some(&bytes(b"eggs")));
            }
            _ => panic!("expected dict"),
        }
    }

    #[test]
    fn reject_descending_dict_keys() {
        assert!(matches!(
            decode(b"d4:spam4:eggs3:cow3:mooe"),
            Err(DecodeError::DictKeyOrder { .. })
        ));
    }

    #[test]
    fn reject_duplicate_dict_keys() {
        assert!(matches!(
            decode(b"d3:cow3:moo3:cow3:mooe"),
            Err(DecodeError::DictKeyOrder { .. })
        ));
    }

    #[test]
    fn reject_non_string_dict_key() {
        assert!(matches!(
            decode(b"di1e3:fooe"),
            Err(DecodeError::DictKeyNotString { .. })
        ));
    }

    #[test]
    fn reject_trailing_bytes() {
        assert!(matches!(
            decode(b"i1eX"),
            Err(DecodeError::TrailingBytes { .. })
        ));
    }

    #[test]
    fn reject_string_length_overrun() {
        assert!(matches!(
            decode(b"10:aa"),
            Err(DecodeError::StringLengthOverrun { .. })
        ));
    }

    #[test]
    fn reject_unexpected_eof() {
        assert!(matches!(
            decode(b"i547"),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }
}

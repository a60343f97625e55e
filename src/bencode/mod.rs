//! The bencoding wire format: a tagged-variant value model plus a
//! canonical decoder and encoder.
//!
//! Byte strings are raw bytes, not text. Bencoding makes no UTF-8
//! guarantee, and this module never assumes one. The only place an
//! encoding is assumed is the JSON emitter (see [`crate::emit::json`]),
//! which surfaces an explicit error when a byte string isn't valid UTF-8.
use std::collections::BTreeMap;
use thiserror::Error;

pub mod decode;
pub mod encode;

pub use decode::decode;
pub use encode::encode;

/// A decoded bencoded value.
///
/// Dictionary keys are always byte strings and are stored in a
/// `BTreeMap`, so ascending iteration order (the canonical order) falls
/// out of the data structure rather than needing a sort pass on every
/// encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bytes(Vec<u8>),
    Integer(i64),
    List(Vec<Value>),
    Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Value>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

/// Why the decoder rejected an input. Carries the byte offset at which
/// the failure was detected, per the spec's "DecodeError carries a byte
/// offset" requirement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input at offset {offset}, expected {expected}")]
    UnexpectedEof { offset: usize, expected: &'static str },

    #[error("unexpected byte {byte:#04x} at offset {offset}, expected {expected}")]
    UnexpectedByte {
        offset: usize,
        byte: u8,
        expected: &'static str,
    },

    #[error("non-canonical integer at offset {offset}: {reason}")]
    NonCanonicalInteger { offset: usize, reason: &'static str },

    #[error("invalid integer literal at offset {offset}")]
    InvalidIntegerLiteral { offset: usize },

    #[error("string length overruns input at offset {offset}")]
    StringLengthOverrun { offset: usize },

    #[error("dictionary key must be a byte string at offset {offset}")]
    DictKeyNotString { offset: usize },

    #[error("dictionary keys out of order at offset {offset}")]
    DictKeyOrder { offset: usize },

    #[error("trailing bytes after value at offset {offset}")]
    TrailingBytes { offset: usize },
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

//! Alternative emitters for a decoded bencoded value (spec component
//! C8): a human pretty-printer, a JSON serializer, and a raw "atom"
//! emitter used by the tree editor's non-mutating mode.
use thiserror::Error;

pub mod atom;
pub mod json;
pub mod pretty;

pub use atom::emit_atom;
pub use json::to_json;
pub use pretty::pretty_print;

/// Why a value could not be emitted in the requested mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("byte string is not valid UTF-8")]
    NotUtf8,

    #[error("value is not a byte string or integer, cannot emit as an atom")]
    NotAnAtom,
}

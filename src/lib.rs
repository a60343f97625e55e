//! Library root for bencode-tools.
//!
//! Re-exports the core subsystems shared by the four CLI binaries: the
//! bencode codec, the validated torrent model, the piece verifier, the
//! selector-based tree editor, the atomic writer, and the alternative
//! (JSON/pretty/atom) emitters.
pub mod bencode;
pub mod emit;
pub mod select;
pub mod torrent;
pub mod verify;
pub mod write;

//! Domain vocabulary for hivebind.
//!
//! Pure types with no store access: where a schema lives ([`key_path`]),
//! what the store holds ([`raw`]), and how things fail ([`error`]).  Both the
//! store backends and the typed accessors are written in terms of these.

pub mod error;
pub mod key_path;
pub mod raw;

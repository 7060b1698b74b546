//! Low-level reading helpers shared by the sprite document decoder.
//!
//! This provides a bounds-checked little-endian cursor over in-memory data
//! ([`mem_reader`]), errors that remember where in the input they happened
//! ([`errors`]), and zlib stream inflation ([`compression`]).

#![warn(missing_docs)]

pub mod compression;
pub mod errors;
pub mod mem_reader;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

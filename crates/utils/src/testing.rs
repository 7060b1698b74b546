//! Helpers for building test inputs.

use std::io::Write as _;

use flate2::Compression;
use flate2::write::ZlibEncoder;

/// Compresses `data` into a zlib stream.
///
/// # Panics
///
/// Panics if the in-memory encoder fails, which does not happen in practice.
#[must_use]
pub fn compress_zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .expect("writing to an in-memory encoder");
    encoder.finish().expect("finishing an in-memory encoder")
}

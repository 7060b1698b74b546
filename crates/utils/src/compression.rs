//! Inflation of zlib-wrapped DEFLATE streams.

use std::io::Read as _;

use flate2::read::ZlibDecoder;

/// Errors produced while inflating a compressed stream.
#[derive(Debug, thiserror::Error)]
pub enum InflateError {
    /// There were no compressed bytes at all.
    #[error("compressed stream is empty")]
    EmptyInput,
    /// The stream was not a valid zlib stream.
    #[error("corrupt compressed stream: {0}")]
    Corrupt(#[source] std::io::Error),
    /// The stream inflated to more than the allowed number of bytes.
    #[error("compressed stream inflates to more than {limit} bytes")]
    TooLarge {
        /// The configured upper bound.
        limit: usize,
    },
}

/// Inflates a complete zlib stream (RFC 1950 wrapper around RFC 1951 data).
///
/// At most `limit` bytes of output are produced. A stream that would inflate
/// to more than that fails with [`InflateError::TooLarge`].
pub fn inflate_zlib(data: &[u8], limit: usize) -> Result<Vec<u8>, InflateError> {
    if data.is_empty() {
        return Err(InflateError::EmptyInput);
    }

    let read_limit = u64::try_from(limit)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut output = Vec::new();
    ZlibDecoder::new(data)
        .take(read_limit)
        .read_to_end(&mut output)
        .map_err(InflateError::Corrupt)?;

    if output.len() > limit {
        return Err(InflateError::TooLarge { limit });
    }

    log::trace!(
        "inflated {} compressed bytes into {} bytes",
        data.len(),
        output.len()
    );
    Ok(output)
}

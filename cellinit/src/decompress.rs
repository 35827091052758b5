//! Transparent gzip unwrapping for fetched user-data.

use std::io::Read;

use cellinit_shared::errors::{CellinitError, CellinitResult};
use flate2::read::MultiGzDecoder;

/// The two leading bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Decompress `data` if it carries the gzip magic, otherwise return it as is.
///
/// Concatenated gzip members are all decompressed, in order. A stream that starts with the magic but is truncated or corrupt is an
/// error; partial output is never returned.
pub fn decompress_if_gzip(data: Vec<u8>) -> CellinitResult<Vec<u8>> {
    if !is_gzip(&data) {
        return Ok(data);
    }

    let mut decoder = MultiGzDecoder::new(data.as_slice());
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CellinitError::Decompression(format!("Failed to decompress gzip stream: {}", e)))?;

    tracing::debug!(
        compressed = data.len(),
        decompressed = out.len(),
        "Decompressed gzip user-data"
    );
    Ok(out)
}

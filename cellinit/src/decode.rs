//! Decoding of the flat key/value configuration document.

use std::collections::BTreeMap;

use cellinit_shared::ResolvedConfig;
use cellinit_shared::errors::{CellinitError, CellinitResult};

/// Flat document as written upstream; `key:` with no value reads as `None`.
type FlatDocument = Option<BTreeMap<String, Option<String>>>;

/// Parse `data` as a YAML mapping of scalars.
///
/// Values keep their source text (`1.10` stays `1.10`, `0x1F` stays `0x1F`)
/// and null becomes an empty string. Nested mappings and sequences are
/// rejected rather than flattened. When a key repeats, the last value wins.
/// An empty document decodes to an empty mapping.
pub fn decode(data: &[u8]) -> CellinitResult<ResolvedConfig> {
    let text = std::str::from_utf8(data).map_err(|e| {
        CellinitError::Schema(format!("Failed to decode configuration: not UTF-8: {}", e))
    })?;

    if is_blank(text) {
        return Ok(ResolvedConfig::empty());
    }

    let document: FlatDocument = serde_yaml::from_str(text)
        .map_err(|e| CellinitError::Schema(format!("Failed to decode configuration: {}", e)))?;

    let config: ResolvedConfig = document
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect();

    tracing::debug!(keys = config.len(), "Decoded configuration");
    Ok(config)
}

/// Only whitespace and comments, i.e. a stream without any document.
fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

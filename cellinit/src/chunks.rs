//! Reassembly of configuration documents split into size-limited chunks.
//!
//! A parameter store caps the size of a single value, so a large document is
//! stored either whole under its base name or split across `<base>-0`,
//! `<base>-1`, ... The two shapes never mix for one document.

use std::collections::HashMap;

use cellinit_shared::errors::{CellinitError, CellinitResult};

/// Base name used when none is configured.
pub const DEFAULT_BASE_NAME: &str = "config";

/// Orders and concatenates the fragments of one document.
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    base: String,
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_NAME)
    }
}

impl ChunkAssembler {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Key of the fragment at `index`.
    pub fn chunk_key(&self, index: u32) -> String {
        format!("{}-{}", self.base, index)
    }

    /// Rebuild the document from `fragments`, keyed by fragment name.
    ///
    /// Order comes from the numeric index in the key, never from the map's
    /// iteration order. Indices must be exactly `0..fragments.len()`.
    pub fn assemble(&self, fragments: &HashMap<String, String>) -> CellinitResult<Vec<u8>> {
        if fragments.is_empty() {
            return Err(CellinitError::NoFragments);
        }

        if fragments.len() == 1 {
            if let Some(whole) = fragments.get(&self.base) {
                tracing::debug!(base = %self.base, bytes = whole.len(), "Using unchunked document");
                return Ok(whole.as_bytes().to_vec());
            }
        }

        let mut ordered: Vec<Option<&str>> = vec![None; fragments.len()];
        for (key, value) in fragments {
            let index = self.parse_index(key)? as usize;
            let slot = ordered.get_mut(index).ok_or_else(|| {
                CellinitError::InvalidChunkKey(format!(
                    "{}: index out of range for {} chunk(s)",
                    key,
                    fragments.len()
                ))
            })?;
            if slot.is_some() {
                return Err(CellinitError::InvalidChunkKey(format!(
                    "{}: duplicate chunk index {}",
                    key, index
                )));
            }
            *slot = Some(value.as_str());
        }

        // Every slot is filled: n distinct indices below n.
        let document: String = ordered.into_iter().flatten().collect();
        tracing::debug!(
            base = %self.base,
            chunks = fragments.len(),
            bytes = document.len(),
            "Assembled chunked document"
        );
        Ok(document.into_bytes())
    }

    /// Parse `N` out of `<base>-N`.
    fn parse_index(&self, key: &str) -> CellinitResult<u32> {
        if key == self.base {
            return Err(CellinitError::InvalidChunkKey(format!(
                "{}: whole-document key mixed with chunk keys",
                key
            )));
        }

        let digits = key
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .ok_or_else(|| {
                CellinitError::InvalidChunkKey(format!(
                    "{}: expected {} or {}-<index>",
                    key, self.base, self.base
                ))
            })?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CellinitError::InvalidChunkKey(format!(
                "{}: chunk index is not a non-negative integer",
                key
            )));
        }

        digits
            .parse::<u32>()
            .map_err(|e| CellinitError::InvalidChunkKey(format!("{}: {}", key, e)))
    }
}

/// Assemble fragments of the document named [`DEFAULT_BASE_NAME`].
pub fn assemble(fragments: &HashMap<String, String>) -> CellinitResult<Vec<u8>> {
    ChunkAssembler::default().assemble(fragments)
}

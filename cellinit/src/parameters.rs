//! Configuration stored in a size-limited parameter store.
//!
//! Parameters live under `<prefix>/<instance-id>/`. The document is either a
//! single `<base>` parameter or a run of `<base>-0`, `<base>-1`, ... chunks
//! written by the control plane when it exceeds the per-value size cap.

use std::collections::HashMap;

use async_trait::async_trait;
use cellinit_shared::errors::CellinitResult;

use crate::chunks::ChunkAssembler;

/// Upper bound on the number of chunks read for one document.
pub const DEFAULT_MAX_CHUNKS: u32 = 10;

/// Read access to a key/value parameter store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Value of `name`, or `None` if the parameter doesn't exist.
    async fn get_parameter(&self, name: &str) -> CellinitResult<Option<String>>;
}

/// In-memory store, keyed by full parameter name.
#[async_trait]
impl ParameterStore for HashMap<String, String> {
    async fn get_parameter(&self, name: &str) -> CellinitResult<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

/// Namespace of one instance's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterPath {
    root: String,
}

impl ParameterPath {
    pub fn new(prefix: &str, instance_id: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            root: format!("{}/{}", prefix, instance_id.trim_matches('/')),
        }
    }

    pub fn join(&self, name: &str) -> String {
        format!("{}/{}", self.root, name)
    }
}

/// Read every fragment of the document from `store`.
///
/// Fetches the whole-document parameter and then consecutive chunks starting
/// at index 0, stopping at the first missing one or after `max_chunks`.
/// Returned keys are relative to `path` (`config`, `config-0`, ...) so the
/// result feeds straight into [`ChunkAssembler::assemble`]. Both shapes are
/// returned when both exist; the assembler rejects that mix.
pub async fn collect_fragments(
    store: &dyn ParameterStore,
    path: &ParameterPath,
    assembler: &ChunkAssembler,
    max_chunks: u32,
) -> CellinitResult<HashMap<String, String>> {
    let mut fragments = HashMap::new();

    let base = assembler.base();
    if let Some(value) = non_empty(store.get_parameter(&path.join(base)).await?) {
        fragments.insert(base.to_string(), value);
    }

    for index in 0..max_chunks {
        let name = assembler.chunk_key(index);
        match non_empty(store.get_parameter(&path.join(&name)).await?) {
            Some(value) => {
                fragments.insert(name, value);
            }
            None => break,
        }
    }

    tracing::debug!(
        path = %path.root,
        fragments = fragments.len(),
        "Collected configuration fragments"
    );
    Ok(fragments)
}

/// Empty values are what a deleted or never-written parameter reads back as.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

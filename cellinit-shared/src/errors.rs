//! Error taxonomy for configuration resolution.
//!
//! Only `NoSourceAvailable` is an expected outcome (e.g. running outside any
//! recognized cloud). Everything else indicates a transport failure, malformed
//! upstream data, or a local I/O problem and aborts resolution.

use std::fmt;

/// Result alias used throughout cellinit.
pub type CellinitResult<T> = Result<T, CellinitError>;

#[derive(Debug, thiserror::Error)]
pub enum CellinitError {
    /// No datasource became available before the deadline, or every
    /// datasource reported itself permanently unavailable.
    #[error("no datasource available")]
    NoSourceAvailable,

    /// The selected datasource failed while fetching.
    #[error("transport error: {0}")]
    Transport(String),

    /// Gzip marker present but the stream is truncated or corrupt.
    #[error("decompression error: {0}")]
    Decompression(String),

    #[error("invalid chunk key: {0}")]
    InvalidChunkKey(String),

    #[error("no configuration fragments found")]
    NoFragments,

    /// The document is not a flat string-to-string mapping.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Addons(AddonErrors),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CellinitError {
    /// True for the quiet "nothing found" outcome.
    pub fn is_no_source(&self) -> bool {
        matches!(self, CellinitError::NoSourceAvailable)
    }
}

impl From<std::io::Error> for CellinitError {
    fn from(e: std::io::Error) -> Self {
        CellinitError::Storage(e.to_string())
    }
}

/// One failed addon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonFailure {
    pub addon: String,
    pub error: String,
}

/// Failures collected from independent addons.
///
/// Addons don't depend on each other, so the runner keeps going after a
/// failure and reports all of them at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddonErrors {
    failures: Vec<AddonFailure>,
}

impl AddonErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, addon: impl Into<String>, error: impl fmt::Display) {
        self.failures.push(AddonFailure {
            addon: addon.into(),
            error: error.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[AddonFailure] {
        &self.failures
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate as an error.
    pub fn into_result(self) -> CellinitResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CellinitError::Addons(self))
        }
    }
}

impl fmt::Display for AddonErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} addon(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n\t* {}: {}", failure.addon, failure.error)?;
        }
        Ok(())
    }
}

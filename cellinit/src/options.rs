//! Resolution options.
//!
//! Loaded from an optional JSON file; every field has a default matching the
//! behavior of a stock cell image.

use std::path::Path;
use std::time::Duration;

use cellinit_shared::errors::{CellinitError, CellinitResult};
use serde::{Deserialize, Serialize};

use crate::chunks::DEFAULT_BASE_NAME;
use crate::collaborators::FileSpec;
use crate::parameters::DEFAULT_MAX_CHUNKS;
use crate::race::RaceConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// First delay between probes of one datasource.
    pub datasource_interval_ms: u64,
    /// Ceiling for the per-datasource probe delay.
    pub datasource_max_interval_ms: u64,
    /// Deadline for picking a datasource.
    pub datasource_timeout_ms: u64,
    /// Base name of the document in the parameter store.
    pub parameter_base: String,
    /// Maximum number of `<base>-N` chunks read from the parameter store.
    pub max_chunks: u32,
    /// Keys to materialize as files after resolution.
    pub files: Vec<FileSpec>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        let race = RaceConfig::default();
        Self {
            datasource_interval_ms: race.initial_interval.as_millis() as u64,
            datasource_max_interval_ms: race.max_interval.as_millis() as u64,
            datasource_timeout_ms: race.timeout.as_millis() as u64,
            parameter_base: DEFAULT_BASE_NAME.to_string(),
            max_chunks: DEFAULT_MAX_CHUNKS,
            files: Vec::new(),
        }
    }
}

impl ResolveOptions {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> CellinitResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CellinitError::Config(format!("Failed to read options {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_str(&raw).map_err(|e| {
            CellinitError::Config(format!("Failed to parse options {}: {}", path.display(), e))
        })?;
        options.sanitize()?;
        Ok(options)
    }

    /// Reject option combinations that cannot work.
    pub fn sanitize(&self) -> CellinitResult<()> {
        if self.datasource_interval_ms == 0 {
            return Err(CellinitError::Config(
                "datasource_interval_ms must be greater than zero".into(),
            ));
        }
        if self.datasource_interval_ms > self.datasource_max_interval_ms {
            return Err(CellinitError::Config(format!(
                "datasource_interval_ms ({}) exceeds datasource_max_interval_ms ({})",
                self.datasource_interval_ms, self.datasource_max_interval_ms
            )));
        }
        if self.datasource_timeout_ms == 0 {
            return Err(CellinitError::Config(
                "datasource_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.parameter_base.is_empty() || self.parameter_base.contains('/') {
            return Err(CellinitError::Config(format!(
                "invalid parameter_base {:?}",
                self.parameter_base
            )));
        }
        if self.max_chunks == 0 {
            return Err(CellinitError::Config(
                "max_chunks must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn race_config(&self) -> RaceConfig {
        RaceConfig {
            initial_interval: Duration::from_millis(self.datasource_interval_ms),
            max_interval: Duration::from_millis(self.datasource_max_interval_ms),
            timeout: Duration::from_millis(self.datasource_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let options = ResolveOptions::default();
        assert!(options.sanitize().is_ok());
        assert_eq!(options.race_config(), RaceConfig::default());
        assert_eq!(options.parameter_base, "config");
        assert_eq!(options.max_chunks, 10);
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(
            &path,
            r#"{"datasource_timeout_ms": 2000, "files": [{"key": "cell", "path": "/tmp/cell.yaml"}]}"#,
        )
        .unwrap();

        let options = ResolveOptions::from_file(&path).unwrap();
        assert_eq!(options.race_config().timeout, Duration::from_secs(2));
        assert_eq!(options.datasource_interval_ms, 100);
        assert_eq!(options.files.len(), 1);
    }

    #[test]
    fn test_sanitize_rejects_bad_intervals() {
        let options = ResolveOptions {
            datasource_interval_ms: 5000,
            datasource_max_interval_ms: 1000,
            ..Default::default()
        };
        assert!(matches!(options.sanitize(), Err(CellinitError::Config(_))));

        let options = ResolveOptions {
            datasource_interval_ms: 0,
            ..Default::default()
        };
        assert!(options.sanitize().is_err());
    }

    #[test]
    fn test_sanitize_rejects_bad_parameter_settings() {
        let options = ResolveOptions {
            parameter_base: "a/b".into(),
            ..Default::default()
        };
        assert!(options.sanitize().is_err());

        let options = ResolveOptions {
            max_chunks: 0,
            ..Default::default()
        };
        assert!(options.sanitize().is_err());
    }

    #[test]
    fn test_from_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(ResolveOptions::from_file(&dir.path().join("missing.json")).is_err());

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ResolveOptions::from_file(&path),
            Err(CellinitError::Config(_))
        ));
    }
}

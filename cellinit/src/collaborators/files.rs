//! Materializes selected configuration keys as files.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use cellinit_shared::ResolvedConfig;
use cellinit_shared::errors::{CellinitError, CellinitResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// One key to persist and where to put it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub key: String,
    pub path: PathBuf,
    #[serde(default = "default_mode")]
    pub mode: u32,
}

fn default_mode() -> u32 {
    DEFAULT_FILE_MODE
}

impl FileSpec {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            mode: DEFAULT_FILE_MODE,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Parse `key=path` or `key=path:mode` (mode in octal, e.g. `0600`).
    pub fn parse(spec: &str) -> CellinitResult<Self> {
        let invalid = |reason: String| {
            CellinitError::Config(format!("Failed to parse file spec {}: {}", spec, reason))
        };

        let (key, rest) = spec
            .split_once('=')
            .ok_or_else(|| invalid("expected key=path[:mode]".into()))?;
        if key.is_empty() || rest.is_empty() {
            return Err(invalid("expected key=path[:mode]".into()));
        }

        let (path, mode) = match rest.rsplit_once(':') {
            Some((path, mode)) if !mode.is_empty() && mode.bytes().all(|b| b.is_ascii_digit()) => {
                let mode = u32::from_str_radix(mode, 8)
                    .map_err(|e| invalid(format!("invalid mode: {}", e)))?;
                (path, mode)
            }
            _ => (rest, DEFAULT_FILE_MODE),
        };

        Ok(Self::new(key, path).with_mode(mode))
    }
}

/// Outcome of a [`FileWriter::write`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    /// Keys that were requested but absent from the configuration.
    pub skipped: Vec<String>,
}

/// Writes configuration values to the paths requested by [`FileSpec`]s.
#[derive(Debug, Default, Clone)]
pub struct FileWriter;

impl FileWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write every spec whose key is present in `config`.
    ///
    /// Missing keys are skipped, not errors: a boot without, say, a version
    /// override falls back to the consumer's defaults. The first I/O failure
    /// aborts.
    pub fn write(&self, config: &ResolvedConfig, specs: &[FileSpec]) -> CellinitResult<WriteSummary> {
        let mut summary = WriteSummary::default();

        for spec in specs {
            let Some(value) = config.get(&spec.key) else {
                tracing::debug!(key = %spec.key, path = %spec.path.display(), "Key not set, skipping file");
                summary.skipped.push(spec.key.clone());
                continue;
            };

            write_file(&spec.path, value.as_bytes(), spec.mode)?;
            tracing::info!(key = %spec.key, path = %spec.path.display(), "Saved file");
            summary.written.push(spec.path.clone());
        }

        Ok(summary)
    }
}

/// Write `contents` to `path` with `mode` (less the process umask).
///
/// The data goes to a sibling file created with the final mode and is then
/// renamed over `path`, so the file is never visible with wider permissions
/// or partially written.
fn write_file(path: &Path, contents: &[u8], mode: u32) -> CellinitResult<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent).map_err(|e| {
            CellinitError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let staging = staging_path(path)?;
    match std::fs::remove_file(&staging) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(CellinitError::Storage(format!(
                "Failed to remove stale {}: {}",
                staging.display(),
                e
            )));
        }
    }

    let written = open_with_mode(&staging, mode).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = std::fs::remove_file(&staging);
        return Err(CellinitError::Storage(format!(
            "Failed to write {}: {}",
            staging.display(),
            e
        )));
    }

    std::fs::rename(&staging, path).map_err(|e| {
        let _ = std::fs::remove_file(&staging);
        CellinitError::Storage(format!(
            "Failed to move {} to {}: {}",
            staging.display(),
            path.display(),
            e
        ))
    })
}

fn staging_path(path: &Path) -> CellinitResult<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        CellinitError::Storage(format!("Failed to write {}: not a file path", path.display()))
    })?;
    let mut staging = std::ffi::OsString::from(".");
    staging.push(name);
    staging.push(".cellinit-tmp");
    Ok(path.with_file_name(staging))
}

#[cfg(unix)]
fn open_with_mode(path: &Path, mode: u32) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn open_with_mode(path: &Path, _mode: u32) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

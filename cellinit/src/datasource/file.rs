//! User-data from a local file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cellinit_shared::errors::{CellinitError, CellinitResult};

use super::Datasource;

/// Reads user-data from a file that may appear after boot (e.g. once a
/// config drive is mounted).
pub struct FileDatasource {
    path: PathBuf,
}

impl FileDatasource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Datasource for FileDatasource {
    fn kind(&self) -> &str {
        "local-file"
    }

    async fn is_available(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn availability_changes(&self) -> bool {
        true
    }

    async fn fetch_userdata(&self) -> CellinitResult<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            CellinitError::Transport(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }
}

//! Azure Linux agent directory.
//!
//! The agent drops `ovf-env.xml` once provisioning data has been received;
//! custom data lands next to it in `CustomData`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cellinit_shared::errors::{CellinitError, CellinitResult};

use super::Datasource;

pub const DEFAULT_ROOT: &str = "/var/lib/waagent";

const OVF_ENV_FILE: &str = "ovf-env.xml";
const CUSTOM_DATA_FILE: &str = "CustomData";

pub struct WaagentDatasource {
    root: PathBuf,
}

impl WaagentDatasource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Datasource for WaagentDatasource {
    fn kind(&self) -> &str {
        "waagent"
    }

    async fn is_available(&self) -> bool {
        tokio::fs::try_exists(self.root.join(OVF_ENV_FILE))
            .await
            .unwrap_or(false)
    }

    fn availability_changes(&self) -> bool {
        true
    }

    async fn fetch_userdata(&self) -> CellinitResult<Vec<u8>> {
        let path = self.root.join(CUSTOM_DATA_FILE);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No custom data provided");
                Ok(Vec::new())
            }
            Err(e) => Err(CellinitError::Transport(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

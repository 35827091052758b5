//! EC2 instance metadata service.

use async_trait::async_trait;
use cellinit_shared::errors::CellinitResult;

use super::{Datasource, fetch_optional, metadata_client, probe};

pub const DEFAULT_ADDRESS: &str = "http://169.254.169.254/";

const API_VERSION: &str = "latest";

pub struct Ec2Datasource {
    root: String,
    client: reqwest::Client,
}

impl Ec2Datasource {
    pub fn new(root: &str) -> CellinitResult<Self> {
        Ok(Self {
            root: normalize_root(root),
            client: metadata_client()?,
        })
    }

    fn metadata_url(&self) -> String {
        format!("{}{}/meta-data/", self.root, API_VERSION)
    }

    fn userdata_url(&self) -> String {
        format!("{}{}/user-data", self.root, API_VERSION)
    }
}

/// Ensure exactly one trailing slash so paths can be appended.
pub(super) fn normalize_root(root: &str) -> String {
    format!("{}/", root.trim_end_matches('/'))
}

#[async_trait]
impl Datasource for Ec2Datasource {
    fn kind(&self) -> &str {
        "ec2-metadata-service"
    }

    async fn is_available(&self) -> bool {
        let url = self.metadata_url();
        probe(self.client.get(&url), &url).await
    }

    fn availability_changes(&self) -> bool {
        true
    }

    async fn fetch_userdata(&self) -> CellinitResult<Vec<u8>> {
        let url = self.userdata_url();
        fetch_optional(self.client.get(&url), &url).await
    }
}

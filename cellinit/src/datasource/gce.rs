//! GCE metadata server.
//!
//! Every request must carry `Metadata-Flavor: Google`, otherwise the server
//! refuses it.

use async_trait::async_trait;
use cellinit_shared::errors::CellinitResult;

use super::ec2::normalize_root;
use super::{Datasource, fetch_optional, metadata_client, probe};

pub const DEFAULT_ADDRESS: &str = "http://metadata.google.internal";

const FLAVOR_HEADER: (&str, &str) = ("Metadata-Flavor", "Google");

pub struct GceDatasource {
    root: String,
    client: reqwest::Client,
}

impl GceDatasource {
    pub fn new(root: &str) -> CellinitResult<Self> {
        Ok(Self {
            root: normalize_root(root),
            client: metadata_client()?,
        })
    }

    fn metadata_url(&self) -> String {
        format!("{}computeMetadata/v1/", self.root)
    }

    fn userdata_url(&self) -> String {
        format!("{}computeMetadata/v1/instance/attributes/user-data", self.root)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url).header(FLAVOR_HEADER.0, FLAVOR_HEADER.1)
    }
}

#[async_trait]
impl Datasource for GceDatasource {
    fn kind(&self) -> &str {
        "gce-metadata-service"
    }

    async fn is_available(&self) -> bool {
        let url = self.metadata_url();
        probe(self.get(&url), &url).await
    }

    fn availability_changes(&self) -> bool {
        true
    }

    async fn fetch_userdata(&self) -> CellinitResult<Vec<u8>> {
        let url = self.userdata_url();
        fetch_optional(self.get(&url), &url).await
    }
}

//! Candidate sources of boot configuration.
//!
//! A datasource only answers three questions: is it reachable now, could that
//! change later, and what are its raw user-data bytes. How it talks to the
//! outside world (metadata HTTP endpoint, agent directory, local file) stays
//! inside the implementation.
//!
//! Available implementations:
//! - `Ec2Datasource` - EC2 instance metadata service
//! - `GceDatasource` - GCE metadata server
//! - `WaagentDatasource` - Azure agent directory
//! - `FileDatasource` - a local file (config drive, hypervisor channel)

mod ec2;
mod file;
mod gce;
mod waagent;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cellinit_shared::errors::{CellinitError, CellinitResult};

pub use ec2::Ec2Datasource;
pub use file::FileDatasource;
pub use gce::GceDatasource;
pub use waagent::WaagentDatasource;

/// Timeout for a single metadata request.
pub const METADATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// A candidate origin of boot configuration.
///
/// The race polls `is_available` repeatedly; only the winner ever sees
/// `fetch_userdata`.
#[async_trait]
pub trait Datasource: Send + Sync {
    /// Short identifier used in logs (e.g. `"ec2-metadata-service"`).
    fn kind(&self) -> &str;

    /// Whether the source can serve user-data right now.
    async fn is_available(&self) -> bool;

    /// Whether a negative `is_available` may turn positive later.
    ///
    /// Returning `false` retires the source for the rest of the resolution.
    fn availability_changes(&self) -> bool;

    /// Fetch raw (possibly gzip-wrapped) user-data.
    async fn fetch_userdata(&self) -> CellinitResult<Vec<u8>>;
}

pub type SharedDatasource = Arc<dyn Datasource>;

/// The datasources probed on a cloud VM when nothing else is configured.
pub fn default_datasources() -> CellinitResult<Vec<SharedDatasource>> {
    let aws: SharedDatasource = Arc::new(Ec2Datasource::new(ec2::DEFAULT_ADDRESS)?);
    let google: SharedDatasource = Arc::new(GceDatasource::new(gce::DEFAULT_ADDRESS)?);
    let azure: SharedDatasource = Arc::new(WaagentDatasource::new(waagent::DEFAULT_ROOT));
    Ok(vec![aws, google, azure])
}

/// Build the HTTP client shared by the metadata-service datasources.
pub(crate) fn metadata_client() -> CellinitResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(METADATA_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| CellinitError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// GET `url` and return its body, treating 404 as empty user-data.
pub(crate) async fn fetch_optional(
    request: reqwest::RequestBuilder,
    url: &str,
) -> CellinitResult<Vec<u8>> {
    let response = request
        .send()
        .await
        .map_err(|e| CellinitError::Transport(format!("Failed to GET {}: {}", url, e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        tracing::debug!(url = %url, "No user-data published");
        return Ok(Vec::new());
    }
    if !status.is_success() {
        return Err(CellinitError::Transport(format!(
            "Failed to GET {}: unexpected status {}",
            url, status
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| CellinitError::Transport(format!("Failed to read body of {}: {}", url, e)))?;
    Ok(body.to_vec())
}

/// Probe `url`; any transport error or non-2xx status counts as unavailable.
pub(crate) async fn probe(request: reqwest::RequestBuilder, url: &str) -> bool {
    match request.send().await {
        Ok(response) => {
            let ok = response.status().is_success();
            tracing::trace!(url = %url, status = %response.status(), "Probed metadata endpoint");
            ok
        }
        Err(e) => {
            tracing::trace!(url = %url, error = %e, "Metadata endpoint unreachable");
            false
        }
    }
}

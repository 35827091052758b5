//! End-to-end configuration resolution.
//!
//! ```text
//! userdata path:   race ──→ fetch ──→ gunzip ─────────────→ decode ──→ ResolvedConfig
//! parameter path:  collect fragments ──→ assemble ──→ gunzip ──→ decode ──→ ResolvedConfig
//! ```
//!
//! [`Resolver::resolve`] tries the userdata path first, falls back to the
//! parameter store when no datasource is available, and settles for an empty
//! configuration when neither exists. Every other failure is returned as is.

use std::sync::Arc;

use cellinit_shared::ResolvedConfig;
use cellinit_shared::errors::{CellinitError, CellinitResult};

use crate::chunks::ChunkAssembler;
use crate::datasource::SharedDatasource;
use crate::decode::decode;
use crate::decompress::decompress_if_gzip;
use crate::options::ResolveOptions;
use crate::parameters::{ParameterPath, ParameterStore, collect_fragments};
use crate::race::{RaceConfig, select_datasource};

/// A parameter store plus the namespace holding this instance's document.
#[derive(Clone)]
pub struct ParameterSource {
    pub store: Arc<dyn ParameterStore>,
    pub path: ParameterPath,
}

pub struct Resolver {
    sources: Vec<SharedDatasource>,
    parameters: Option<ParameterSource>,
    race: RaceConfig,
    assembler: ChunkAssembler,
    max_chunks: u32,
}

impl Resolver {
    /// Create a resolver over `sources`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `options` don't pass [`ResolveOptions::sanitize`].
    pub fn new(sources: Vec<SharedDatasource>, options: &ResolveOptions) -> CellinitResult<Self> {
        options.sanitize()?;
        Ok(Self {
            sources,
            parameters: None,
            race: options.race_config(),
            assembler: ChunkAssembler::new(options.parameter_base.clone()),
            max_chunks: options.max_chunks,
        })
    }

    /// Use `store` as the fallback when no datasource is available.
    pub fn with_parameter_store(mut self, store: Arc<dyn ParameterStore>, path: ParameterPath) -> Self {
        self.parameters = Some(ParameterSource { store, path });
        self
    }

    /// Resolve with fallback: datasources, then parameter store, then empty.
    pub async fn resolve(&self) -> CellinitResult<ResolvedConfig> {
        match self.resolve_userdata().await {
            Err(e) if e.is_no_source() => {}
            other => return other,
        }

        if self.parameters.is_some() {
            tracing::info!("No datasource available, reading parameter store");
            return self.resolve_parameters().await;
        }

        tracing::info!("No configuration source available, using empty configuration");
        Ok(ResolvedConfig::empty())
    }

    /// Race the datasources and decode the winner's user-data.
    ///
    /// # Errors
    ///
    /// - `NoSourceAvailable` if no datasource became available in time
    /// - `Transport` if the winner failed to serve its user-data
    /// - `Decompression` / `Schema` for malformed user-data
    pub async fn resolve_userdata(&self) -> CellinitResult<ResolvedConfig> {
        let source = select_datasource(self.sources.clone(), self.race)
            .await
            .ok_or(CellinitError::NoSourceAvailable)?;

        tracing::debug!(source = %source.kind(), "Fetching user-data");
        let raw = source.fetch_userdata().await.map_err(|e| match e {
            CellinitError::Transport(msg) => {
                CellinitError::Transport(format!("{}: {}", source.kind(), msg))
            }
            other => other,
        })?;

        let data = decompress_if_gzip(raw)?;
        let config = decode(&data)?;
        tracing::info!(source = %source.kind(), keys = config.len(), "Resolved user-data");
        Ok(config)
    }

    /// Read, reassemble and decode the document in the parameter store.
    ///
    /// # Errors
    ///
    /// - `NoSourceAvailable` if no parameter store is configured
    /// - `Transport` if the store failed
    /// - `NoFragments` / `InvalidChunkKey` for missing or inconsistent chunks
    /// - `Decompression` / `Schema` for a malformed document
    pub async fn resolve_parameters(&self) -> CellinitResult<ResolvedConfig> {
        let ParameterSource { store, path } = self
            .parameters
            .as_ref()
            .ok_or(CellinitError::NoSourceAvailable)?;

        let fragments =
            collect_fragments(store.as_ref(), path, &self.assembler, self.max_chunks).await?;
        let document = self.assembler.assemble(&fragments)?;
        let data = decompress_if_gzip(document)?;
        let config = decode(&data)?;
        tracing::info!(fragments = fragments.len(), keys = config.len(), "Resolved parameters");
        Ok(config)
    }
}

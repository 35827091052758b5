//! Hands a resolved configuration to the file writer and the addons.

use cellinit_shared::ResolvedConfig;
use cellinit_shared::errors::CellinitResult;

use super::files::{FileSpec, FileWriter, WriteSummary};
use crate::addons::{AddonRegistry, AddonReport, AddonRunner};

/// What the collaborators did with a configuration.
#[derive(Debug, Clone, Default)]
pub struct HandoffReport {
    pub files: WriteSummary,
    pub addons: AddonReport,
}

/// Write the requested files, then run every addon.
///
/// A file that cannot be written fails the hand-off. Addon failures are
/// logged as warnings and left in the report; the boot carries on.
pub async fn hand_off(
    config: &ResolvedConfig,
    files: &[FileSpec],
    registry: &AddonRegistry,
    runner: AddonRunner,
) -> CellinitResult<HandoffReport> {
    let files = FileWriter::new().write(config, files)?;
    tracing::debug!(
        written = files.written.len(),
        skipped = files.skipped.len(),
        "Files materialized"
    );

    let addons = runner.run(registry, config).await;
    if let Err(e) = addons.errors().into_result() {
        tracing::warn!(error = %e, "Continuing boot despite addon failures");
    }

    Ok(HandoffReport { files, addons })
}

//! Types shared by the cellinit resolution core and the collaborators that
//! consume its output.

pub mod config;
pub mod errors;

pub use config::ResolvedConfig;
pub use errors::{AddonErrors, AddonFailure, CellinitError, CellinitResult};

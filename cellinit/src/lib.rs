//! Boot-time configuration resolution for cell virtual machines.
//!
//! ```text
//! Datasources ──race──→ winner ──fetch──→ bytes ──gunzip──→ decode ──→ ResolvedConfig
//!                                                                        │
//! ParameterStore ──fragments──→ ChunkAssembler ──┘ (fallback)            ├──→ FileWriter
//!                                                                        └──→ AddonRunner
//! ```

pub mod addons;
pub mod chunks;
pub mod collaborators;
pub mod datasource;
pub mod decode;
pub mod decompress;
pub mod logging;
pub mod options;
pub mod parameters;
pub mod race;
pub mod resolver;

pub use cellinit_shared::{CellinitError, CellinitResult, ResolvedConfig};
pub use datasource::{Datasource, SharedDatasource};
pub use options::ResolveOptions;
pub use race::{RaceConfig, select_datasource};
pub use resolver::Resolver;

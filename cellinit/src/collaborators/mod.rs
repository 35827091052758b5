//! Consumers of the resolved configuration that live outside the core.

pub mod files;
mod handoff;

pub use files::{FileSpec, FileWriter, WriteSummary};
pub use handoff::{HandoffReport, hand_off};

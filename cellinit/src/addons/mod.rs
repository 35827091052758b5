//! Post-boot addons.
//!
//! An addon is an independent action that reads the resolved configuration
//! (e.g. configure a log shipper, mount an image cache). The set of addons is
//! an explicit [`AddonRegistry`] built by the caller at startup and handed to
//! the [`AddonRunner`]; nothing registers itself behind the caller's back.
//!
//! ```text
//! ResolvedConfig ──→ AddonRunner ─┬─ addon A ─┐
//!                                 ├─ addon B ─┼──→ AddonReport / AddonErrors
//!                                 └─ addon C ─┘
//! ```

mod report;
mod runner;

use async_trait::async_trait;
use cellinit_shared::ResolvedConfig;
use cellinit_shared::errors::{CellinitError, CellinitResult};

pub use report::{AddonMetrics, AddonOutcome, AddonReport};
pub use runner::{AddonRunner, ExecutionMode};

/// An independent post-boot action.
#[async_trait]
pub trait Addon: Send + Sync {
    /// Human-readable name used in logs and error reports.
    fn name(&self) -> &str;

    /// Run with the full resolved configuration.
    ///
    /// Addons that find none of their keys should return `Ok(())`.
    async fn run(&self, config: &ResolvedConfig) -> CellinitResult<()>;
}

pub type BoxedAddon = Box<dyn Addon>;

/// Ordered table of addons.
#[derive(Default)]
pub struct AddonRegistry {
    addons: Vec<BoxedAddon>,
}

impl AddonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an addon; names must be unique.
    pub fn register(&mut self, addon: BoxedAddon) -> CellinitResult<()> {
        if self.addons.iter().any(|a| a.name() == addon.name()) {
            return Err(CellinitError::Config(format!(
                "addon {} already registered",
                addon.name()
            )));
        }
        self.addons.push(addon);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, addon: BoxedAddon) -> CellinitResult<Self> {
        self.register(addon)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.addons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.addons.iter().map(|a| a.name())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BoxedAddon> {
        self.addons.iter()
    }
}

impl std::fmt::Debug for AddonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(&'static str);

    #[async_trait]
    impl Addon for Noop {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _config: &ResolvedConfig) -> CellinitResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_keeps_order() {
        let registry = AddonRegistry::new()
            .with(Box::new(Noop("nfs")))
            .unwrap()
            .with(Box::new(Noop("fluentd-aws")))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["nfs", "fluentd-aws"]
        );
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = AddonRegistry::new();
        registry.register(Box::new(Noop("nfs"))).unwrap();
        let err = registry.register(Box::new(Noop("nfs"))).unwrap_err();
        assert!(matches!(err, CellinitError::Config(_)));
        assert_eq!(registry.len(), 1);
    }
}

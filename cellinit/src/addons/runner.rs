//! Addon execution.

use std::time::Instant;

use cellinit_shared::ResolvedConfig;
use futures::future::join_all;

use super::report::{AddonMetrics, AddonOutcome, AddonReport};
use super::{AddonRegistry, BoxedAddon};

/// How the addons of a registry are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One after another, in registration order.
    #[default]
    Sequential,
    /// All at once; addons must not depend on each other's side effects.
    Parallel,
}

/// Runs every addon of a registry and collects the outcome of each.
///
/// A failing addon never stops the others. Unlike a fail-fast pipeline the
/// runner always completes the whole table and reports all failures together.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddonRunner {
    execution: ExecutionMode,
}

impl AddonRunner {
    pub fn new(execution: ExecutionMode) -> Self {
        Self { execution }
    }

    pub fn sequential() -> Self {
        Self::new(ExecutionMode::Sequential)
    }

    pub fn parallel() -> Self {
        Self::new(ExecutionMode::Parallel)
    }

    /// Run all addons in `registry` against `config`.
    ///
    /// Use [`AddonReport::errors`] to collect the failures.
    pub async fn run(&self, registry: &AddonRegistry, config: &ResolvedConfig) -> AddonReport {
        let total_start = Instant::now();
        tracing::info!(count = registry.len(), execution = ?self.execution, "Running addons");

        let addons = match self.execution {
            ExecutionMode::Parallel => {
                join_all(registry.iter().map(|addon| run_one(addon, config))).await
            }
            ExecutionMode::Sequential => {
                let mut addons = Vec::with_capacity(registry.len());
                for addon in registry.iter() {
                    addons.push(run_one(addon, config).await);
                }
                addons
            }
        };

        AddonReport {
            total_duration_ms: total_start.elapsed().as_millis(),
            addons,
        }
    }
}

async fn run_one(addon: &BoxedAddon, config: &ResolvedConfig) -> AddonMetrics {
    let name = addon.name().to_string();
    let start = Instant::now();
    tracing::info!(addon = %name, "Running addon");

    let outcome = match addon.run(config).await {
        Ok(()) => {
            tracing::debug!(addon = %name, "Addon succeeded");
            AddonOutcome::Succeeded
        }
        Err(e) => {
            tracing::error!(addon = %name, error = %e, "Addon failed");
            AddonOutcome::Failed(e.to_string())
        }
    };

    AddonMetrics {
        name,
        duration_ms: start.elapsed().as_millis(),
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addons::Addon;
    use async_trait::async_trait;
    use cellinit_shared::errors::{CellinitError, CellinitResult};
    use std::sync::{Arc, Mutex};

    /// Records the config value it was asked about; fails on demand.
    struct Recording {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Addon for Recording {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, config: &ResolvedConfig) -> CellinitResult<()> {
            let seen = config.get("cluster").unwrap_or("-").to_string();
            self.log.lock().unwrap().push(format!("{}:{}", self.name, seen));
            if self.fail {
                return Err(CellinitError::Internal(format!("{} broke", self.name)));
            }
            Ok(())
        }
    }

    fn registry(table: &[(&'static str, bool)], log: &Arc<Mutex<Vec<String>>>) -> AddonRegistry {
        let mut registry = AddonRegistry::new();
        for &(name, fail) in table {
            registry
                .register(Box::new(Recording {
                    name,
                    fail,
                    log: Arc::clone(log),
                }))
                .unwrap();
        }
        registry
    }

    fn config() -> ResolvedConfig {
        [("cluster", "prod")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_sequential_runs_all_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&[("a", false), ("b", false), ("c", false)], &log);

        let report = AddonRunner::sequential().run(&registry, &config()).await;

        assert_eq!(*log.lock().unwrap(), vec!["a:prod", "b:prod", "c:prod"]);
        assert_eq!(report.succeeded_count(), 3);
        assert!(report.addon_duration_ms("b").is_some());
        assert!(report.errors().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_addons() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&[("a", true), ("b", false), ("c", true)], &log);

        let report = AddonRunner::sequential().run(&registry, &config()).await;

        assert_eq!(log.lock().unwrap().len(), 3);
        assert_eq!(report.succeeded_count(), 1);
        let failed: Vec<_> = report.failed().map(|m| m.name.as_str()).collect();
        assert_eq!(failed, vec!["a", "c"]);

        match report.errors().into_result() {
            Err(CellinitError::Addons(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors.failures()[0].addon, "a");
                assert!(errors.failures()[1].error.contains("c broke"));
            }
            other => panic!("expected aggregated addon errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parallel_collects_every_outcome() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&[("a", false), ("b", true), ("c", false)], &log);

        let report = AddonRunner::parallel().run(&registry, &config()).await;

        assert_eq!(log.lock().unwrap().len(), 3);
        let names: Vec<_> = report.addons.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(report.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let report = AddonRunner::default()
            .run(&AddonRegistry::new(), &ResolvedConfig::empty())
            .await;
        assert!(report.addons.is_empty());
        assert!(report.errors().into_result().is_ok());
    }
}

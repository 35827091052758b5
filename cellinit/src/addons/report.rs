use cellinit_shared::errors::AddonErrors;

/// How a single addon run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddonOutcome {
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AddonMetrics {
    pub name: String,
    pub duration_ms: u128,
    pub outcome: AddonOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct AddonReport {
    pub total_duration_ms: u128,
    pub addons: Vec<AddonMetrics>,
}

impl AddonReport {
    pub fn addon_duration_ms(&self, name: &str) -> Option<u128> {
        self.addons
            .iter()
            .find(|addon| addon.name == name)
            .map(|addon| addon.duration_ms)
    }

    pub fn failed(&self) -> impl Iterator<Item = &AddonMetrics> {
        self.addons
            .iter()
            .filter(|addon| matches!(addon.outcome, AddonOutcome::Failed(_)))
    }

    /// Failures as an aggregate error value.
    pub fn errors(&self) -> AddonErrors {
        let mut errors = AddonErrors::new();
        for addon in &self.addons {
            if let AddonOutcome::Failed(error) = &addon.outcome {
                errors.push(addon.name.clone(), error);
            }
        }
        errors
    }

    pub fn succeeded_count(&self) -> usize {
        self.addons
            .iter()
            .filter(|addon| addon.outcome == AddonOutcome::Succeeded)
            .count()
    }
}

//! The resolved configuration mapping handed to collaborators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat string-to-string configuration produced by resolution.
///
/// Immutable once built. Keys are unique; iteration is ordered by key so
/// collaborators see the same order on every boot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedConfig {
    entries: BTreeMap<String, String>,
}

impl ResolvedConfig {
    /// Empty configuration (used when no source is available).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose key starts with `prefix`, with the prefix stripped.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.entries
            .iter()
            .filter_map(move |(k, v)| k.strip_prefix(prefix).map(|name| (name, v.as_str())))
    }

    /// Command-line arguments for keys carrying `prefix`.
    ///
    /// `itzoFlag-use-podman: "true"` with prefix `itzoFlag` becomes
    /// `["-use-podman", "true"]`. Pairs are ordered by key.
    pub fn flag_args(&self, prefix: &str) -> Vec<String> {
        self.with_prefix(prefix)
            .flat_map(|(name, value)| [name.to_string(), value.to_string()])
            .collect()
    }
}

/// Later duplicates overwrite earlier ones.
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResolvedConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_duplicate_wins() {
        let config: ResolvedConfig = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("a"), Some("3"));
    }

    #[test]
    fn test_flag_args_without_flags() {
        let config: ResolvedConfig = [("dummy", "dummy")].into_iter().collect();
        assert!(config.flag_args("itzoFlag").is_empty());
    }

    #[test]
    fn test_flag_args_keep_values_whole() {
        let config: ResolvedConfig = [("itzoFlag-labels", "a=1 b=2")].into_iter().collect();
        assert_eq!(config.flag_args("itzoFlag"), vec!["-labels", "a=1 b=2"]);
    }

    #[test]
    fn test_flag_args_strips_prefix() {
        let config: ResolvedConfig = [
            ("dummy", "dummy"),
            ("itzoFlag-use-podman", "true"),
            ("itzoFlag-v", "5"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            config.flag_args("itzoFlag"),
            vec!["-use-podman", "true", "-v", "5"]
        );
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let config: ResolvedConfig = [("usePodman", "true")].into_iter().collect();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"usePodman":"true"}"#);
    }
}

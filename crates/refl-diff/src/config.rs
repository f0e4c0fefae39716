use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};

/// Options that shape which differences become changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Zero values in the new instance are real values: they produce changes,
    /// and a nil reference or container replaces a present one.
    pub nil_valid: bool,
    /// Entries of a deep-compared map that are missing from the new instance
    /// are deletions rather than omissions.
    pub new_item_is_full: bool,
}

impl UpdaterConfig {
    /// Treat zero and nil values in the new instance as intentional.
    pub fn nil_valid() -> Self {
        Self {
            nil_valid: true,
            ..Default::default()
        }
    }

    /// The new instance is complete: absent map entries are deleted.
    pub fn full_items() -> Self {
        Self {
            new_item_is_full: true,
            ..Default::default()
        }
    }

    /// Read a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> DiffResult<Self> {
        toml::from_str(text).map_err(|e| DiffError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let config = UpdaterConfig::default();
        assert!(!config.nil_valid);
        assert!(!config.new_item_is_full);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = UpdaterConfig::from_toml_str("nil_valid = true").unwrap();
        assert_eq!(config, UpdaterConfig::nil_valid());

        let config = UpdaterConfig::from_toml_str("").unwrap();
        assert_eq!(config, UpdaterConfig::default());
    }

    #[test]
    fn toml_rejects_wrong_types() {
        assert!(matches!(
            UpdaterConfig::from_toml_str("new_item_is_full = \"yes\""),
            Err(DiffError::Config(_))
        ));
    }
}

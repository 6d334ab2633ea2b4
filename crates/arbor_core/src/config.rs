//! Reconciler configuration

use serde::Deserialize;

use crate::error::{ReconcileError, Result};

/// Arbor reconciler configuration
///
/// ```
/// use arbor_core::ReconcilerConfig;
///
/// let config = ReconcilerConfig::from_toml_str("max_modifier_depth = 32").unwrap();
/// assert_eq!(config.max_modifier_depth, 32);
/// assert!(config.coalesce_updates);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcilerConfig {
    /// Maximum number of modifier layers and composed expansions walked while
    /// reducing one modified element. Exceeding it is treated as a cycle.
    pub max_modifier_depth: usize,
    /// Skip enqueueing a node that is already waiting for the next flush
    pub coalesce_updates: bool,
    /// Log the host tree at debug level after every flush
    pub log_tree_after_flush: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_modifier_depth: 256,
            coalesce_updates: true,
            log_tree_after_flush: false,
        }
    }
}

impl ReconcilerConfig {
    /// Parse a configuration from TOML, filling missing keys with defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ReconcileError::InvalidConfig(e.to_string()))?;
        if config.max_modifier_depth == 0 {
            return Err(ReconcileError::InvalidConfig(
                "max_modifier_depth must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_document() {
        let config = ReconcilerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReconcilerConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = ReconcilerConfig::from_toml_str(
            "coalesce_updates = false\nlog_tree_after_flush = true",
        )
        .unwrap();
        assert!(!config.coalesce_updates);
        assert!(config.log_tree_after_flush);
        assert_eq!(config.max_modifier_depth, 256);
    }

    #[test]
    fn test_rejects_unknown_keys_and_zero_depth() {
        assert!(matches!(
            ReconcilerConfig::from_toml_str("max_depth = 3"),
            Err(ReconcileError::InvalidConfig(_))
        ));
        assert!(matches!(
            ReconcilerConfig::from_toml_str("max_modifier_depth = 0"),
            Err(ReconcileError::InvalidConfig(_))
        ));
    }
}

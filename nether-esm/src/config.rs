//! Reader configuration (TOML)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{EsmError, Result};

/// What the file reader does when one record fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordErrorPolicy {
    /// Stop and return the error
    #[default]
    Abort,
    /// Log, count and continue after the record's declared size
    Skip,
}

/// File reader settings.
///
/// ```toml
/// dialect = "modern"
/// on_record_error = "skip"
/// localized = true
/// keep_unknown_records = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Force a dialect instead of sniffing the file header
    #[serde(default)]
    pub dialect: Option<Dialect>,
    #[serde(default)]
    pub on_record_error: RecordErrorPolicy,
    /// Override the localized flag of the file header
    #[serde(default)]
    pub localized: Option<bool>,
    /// Keep unrecognized record types as generic records (default: true)
    #[serde(default = "default_true")]
    pub keep_unknown_records: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            dialect: None,
            on_record_error: RecordErrorPolicy::default(),
            localized: None,
            keep_unknown_records: default_true(),
        }
    }
}

impl ReaderConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| EsmError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EsmError::Config(e.to_string()))
    }

    pub fn with_policy(mut self, policy: RecordErrorPolicy) -> Self {
        self.on_record_error = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();
        assert_eq!(config.dialect, None);
        assert_eq!(config.on_record_error, RecordErrorPolicy::Abort);
        assert!(config.keep_unknown_records);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        assert_eq!(
            ReaderConfig::from_toml_str("").unwrap(),
            ReaderConfig::default()
        );
    }

    #[test]
    fn test_partial_toml() {
        let config =
            ReaderConfig::from_toml_str("dialect = \"legacy\"\non_record_error = \"skip\"\n")
                .unwrap();
        assert_eq!(config.dialect, Some(Dialect::Legacy));
        assert_eq!(config.on_record_error, RecordErrorPolicy::Skip);
        assert_eq!(config.localized, None);
        assert!(config.keep_unknown_records);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = ReaderConfig {
            dialect: Some(Dialect::Modern),
            localized: Some(true),
            keep_unknown_records: false,
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ReaderConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        assert!(matches!(
            ReaderConfig::from_toml_str("on_record_error = \"retry\""),
            Err(EsmError::Config(_))
        ));
    }
}

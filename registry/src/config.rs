//! Registry configuration.
//!
//! Defines the YAML-serializable configuration that controls the alias
//! collision policy and where the durable mirror lives. Every field has a
//! default, so an empty file is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! alias_policy: reject
//! storage:
//!   path: /var/lib/modreg/registry.db
//!   prefix: reg_
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What happens when a module claims a short alias that already resolves to
/// a different command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AliasPolicy {
    /// The newest registration takes the alias over; a warning is logged.
    #[default]
    LastWriterWins,
    /// The registration fails with [`Clash::Alias`](crate::Clash::Alias).
    Reject,
}

/// Location of the SQLite mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; `None` keeps the registry in memory only.
    pub path: Option<PathBuf>,
    /// Table prefix (alphanumerics and underscores).
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            prefix: "reg_".to_string(),
        }
    }
}

/// Top-level registry configuration.
///
/// # Examples
///
/// ```
/// use command_registry::{AliasPolicy, RegistryConfig};
///
/// let config: RegistryConfig = serde_yaml::from_str("alias_policy: reject").unwrap();
/// assert_eq!(config.alias_policy, AliasPolicy::Reject);
/// assert_eq!(config.storage.prefix, "reg_");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Alias collision handling.
    pub alias_policy: AliasPolicy,
    /// Durable mirror settings.
    pub storage: StorageConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            alias_policy: AliasPolicy::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::RegistryError::Io) if the file cannot be read,
    /// or [`Yaml`](crate::RegistryError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
alias_policy: reject
storage:
  path: /tmp/registry.db
  prefix: test_
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: RegistryConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.alias_policy, AliasPolicy::Reject);
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/registry.db")));
        assert_eq!(config.storage.prefix, "test_");
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: RegistryConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.alias_policy, AliasPolicy::LastWriterWins);
        assert_eq!(config.storage.path, None);
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.yml");

        let original: RegistryConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = RegistryConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(RegistryConfig::load("/nonexistent/registry.yml").is_err());
    }
}

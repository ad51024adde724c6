//! Core configuration.
//!
//! # Responsibility
//! - Describe where data lives and how the store bootstraps.
//! - Load settings from TOML with defaults for every field.
//!
//! # Invariants
//! - A missing config file is not an error; defaults apply.
//! - `default_list` and `key_prefix` are never blank after `validate`.

use crate::id::IdStrategy;
use crate::logging::default_log_level;
use crate::model::state::DEFAULT_LIST_NAME;
use crate::repo::persistence::DEFAULT_KEY_PREFIX;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "taskbook.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Settings shared by every front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Directory holding the database and logs. Relative paths resolve
    /// against the working directory.
    pub data_dir: PathBuf,
    pub db_file_name: String,
    /// Namespace prefix for persisted collection keys.
    pub key_prefix: String,
    /// List inserted when the last list is deleted.
    pub default_list: String,
    pub id_strategy: IdStrategy,
    /// Seed example lists/tags/task on first run.
    pub seed_defaults: bool,
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            db_file_name: DEFAULT_DB_FILE_NAME.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_list: DEFAULT_LIST_NAME.to_string(),
            id_strategy: IdStrategy::default(),
            seed_defaults: true,
            log_level: default_log_level().to_string(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, returning defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_list.trim().is_empty() {
            return Err(ConfigError::Invalid("default_list cannot be blank".to_string()));
        }
        if self.key_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("key_prefix cannot be blank".to_string()));
        }
        if self.db_file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("db_file_name cannot be blank".to_string()));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::id::IdStrategy;
    use std::path::PathBuf;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CoreConfig::from_toml_str(
            "default_list = \"Inbox\"\nid_strategy = \"pseudo_random\"\n",
        )
        .unwrap();
        assert_eq!(config.default_list, "Inbox");
        assert_eq!(config.id_strategy, IdStrategy::PseudoRandom);
        assert_eq!(config.key_prefix, "taskbook_v1");
        assert!(config.seed_defaults);
    }

    #[test]
    fn blank_default_list_is_rejected() {
        let err = CoreConfig::from_toml_str("default_list = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn paths_derive_from_data_dir() {
        let config = CoreConfig {
            data_dir: PathBuf::from("/var/lib/taskbook"),
            ..CoreConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/taskbook/taskbook.sqlite3"));
        assert_eq!(config.log_dir(), PathBuf::from("/var/lib/taskbook/logs"));
    }
}

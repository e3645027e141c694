//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe storage, logging and validation settings in one TOML document.
//! - Resolve the effective database path (env override, file, fallback).
//!
//! # Invariants
//! - Every field has a default; an empty document is a valid config.
//! - Unknown keys are rejected so typos do not silently fall back.

use crate::logging::default_log_level;
use crate::model::comment::DEFAULT_MAX_COMMENT_CHARS;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable overriding `db_path`.
pub const DB_PATH_ENV: &str = "COMMENTS_DB_PATH";
const FALLBACK_DB_FILE_NAME: &str = "comments.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file. Falls back to the system temp dir when unset.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    /// Upper bound for comment bodies, in characters.
    pub max_comment_chars: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            max_comment_chars: DEFAULT_MAX_COMMENT_CHARS,
        }
    }
}

impl CoreConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            source: err,
        })?;
        Self::from_toml_str(&source)
    }

    /// Effective database path.
    ///
    /// Order: `COMMENTS_DB_PATH`, then `db_path`, then the temp dir.
    pub fn resolved_db_path(&self) -> PathBuf {
        self.resolved_db_path_with(|key| std::env::var(key).ok())
    }

    fn resolved_db_path_with(&self, lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(raw) = lookup(DB_PATH_ENV) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
        self.db_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(FALLBACK_DB_FILE_NAME))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_comment_chars == 0 {
            return Err(ConfigError::Invalid(
                "max_comment_chars must be greater than zero".to_string(),
            ));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
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
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
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

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DB_PATH_ENV};
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn parses_overrides() {
        let config = CoreConfig::from_toml_str(
            r#"
db_path = "/var/lib/comments.db"
log_level = "warn"
max_comment_chars = 280
"#,
        )
        .expect("config parses");
        assert_eq!(config.db_path, Some(PathBuf::from("/var/lib/comments.db")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.max_comment_chars, 280);
    }

    #[test]
    fn rejects_unknown_keys_and_zero_limit() {
        let err = CoreConfig::from_toml_str("db_pth = \"x\"").expect_err("typo rejected");
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = CoreConfig::from_toml_str("max_comment_chars = 0").expect_err("zero rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_relative_log_dir() {
        let err = CoreConfig::from_toml_str("log_dir = \"logs\"").expect_err("relative rejected");
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn env_override_wins_over_file_value() {
        let config = CoreConfig {
            db_path: Some(PathBuf::from("/from/file.db")),
            ..CoreConfig::default()
        };
        let from_env = config.resolved_db_path_with(|key| {
            (key == DB_PATH_ENV).then(|| "/from/env.db".to_string())
        });
        assert_eq!(from_env, PathBuf::from("/from/env.db"));

        let blank_env = config.resolved_db_path_with(|_| Some("  ".to_string()));
        assert_eq!(blank_env, PathBuf::from("/from/file.db"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

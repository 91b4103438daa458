//! Runtime configuration.
//!
//! Values come from a TOML file (`--config` or `config/default.toml`),
//! then `SKILLMART_*` environment variables (a `.env` file is honoured).
//! Every field has a default, so a missing default file is not an error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use skillmart_catalog::MAX_SLUG_ATTEMPTS;
use skillmart_catalog::slug::DEFAULT_SLUG_LENGTH;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Upper bound on the configured base-slug length; leaves room for the
/// username and attempt suffixes within the 100-character slug limit.
const MAX_BASE_LENGTH: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillmartConfig {
    pub database: DatabaseConfig,
    pub slugs: SlugConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/skillmart.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlugConfig {
    pub max_attempts: u32,
    pub max_length: usize,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_SLUG_ATTEMPTS,
            max_length: DEFAULT_SLUG_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

/// Where the configuration came from, for logging after tracing is up.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl SkillmartConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] if present.
    ///
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = match path {
            Some(path) => (Self::from_file(path)?, ConfigSource::File(path.to_path_buf())),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    (Self::from_file(default)?, ConfigSource::File(default.to_path_buf()))
                } else {
                    (Self::default(), ConfigSource::Defaults)
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok((config, source))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse TOML config {}", path.display()))
    }

    /// Apply `SKILLMART_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup("SKILLMART_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = lookup("SKILLMART_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(attempts) = lookup("SKILLMART_MAX_SLUG_ATTEMPTS") {
            self.slugs.max_attempts = attempts
                .trim()
                .parse()
                .with_context(|| format!("SKILLMART_MAX_SLUG_ATTEMPTS is not a number: {attempts}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.slugs.max_attempts == 0 {
            bail!("slugs.max_attempts must be at least 1");
        }
        if self.slugs.max_length == 0 || self.slugs.max_length > MAX_BASE_LENGTH {
            bail!("slugs.max_length must be between 1 and {MAX_BASE_LENGTH}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_catalog_constants() {
        let config = SkillmartConfig::default();
        assert_eq!(config.slugs.max_attempts, 10);
        assert_eq!(config.slugs.max_length, 50);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\npath = \"/tmp/x.db\"\n").unwrap();

        let config = SkillmartConfig::from_file(&path).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.slugs, SlugConfig::default());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SkillmartConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[slugs\nmax_attempts = ").unwrap();
        assert!(SkillmartConfig::from_file(&path).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("SKILLMART_DB_PATH", "/var/lib/skillmart.db"),
            ("SKILLMART_LOG_LEVEL", "debug"),
            ("SKILLMART_MAX_SLUG_ATTEMPTS", " 3 "),
        ]
        .into_iter()
        .collect();

        let mut config = SkillmartConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/skillmart.db"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.slugs.max_attempts, 3);
    }

    #[test]
    fn bad_override_is_rejected() {
        let mut config = SkillmartConfig::default();
        let result = config.apply_overrides(|k| {
            (k == "SKILLMART_MAX_SLUG_ATTEMPTS").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn validation_bounds() {
        let mut config = SkillmartConfig::default();
        config.slugs.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = SkillmartConfig::default();
        config.slugs.max_length = 65;
        assert!(config.validate().is_err());
    }
}

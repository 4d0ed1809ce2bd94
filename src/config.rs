//! Project configuration loaded from `.itdgen.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::itd::builder::DEFAULT_MAX_NAME_ATTEMPTS;
use crate::metadata::service::ServiceSettings;

/// Configuration file name at the project root.
pub const CONFIG_FILE: &str = ".itdgen.toml";

/// How log lines are formatted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable lines.
    #[default]
    Text,
}

/// Project configuration. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Appended to a governor's name to form its artifact name.
    pub artifact_suffix: String,
    /// Maximum number of cached metadata items.
    pub cache_capacity: usize,
    /// Log line format.
    pub log_format: LogFormat,
    /// Default log filter when `ITDGEN_LOG` is unset.
    pub log_level: Option<String>,
    /// Cap on `_` prefixes when a generated field name is taken.
    pub max_name_attempts: usize,
    /// Rounds of deferred recomputation before giving up.
    pub max_retry_rounds: usize,
    /// Module name to directory relative to the root. The root module
    /// (`""` → `.`) is always present.
    pub modules: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let settings = ServiceSettings::default();
        return Self {
            artifact_suffix: "_Itd".to_string(),
            cache_capacity: settings.cache_capacity,
            log_format: LogFormat::Text,
            log_level: None,
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
            max_retry_rounds: settings.max_retry_rounds,
            modules: BTreeMap::from([(String::new(), PathBuf::from("."))]),
        };
    }
}

impl Config {
    /// Load `.itdgen.toml` from `root`. A missing file yields the defaults;
    /// a file that exists but is malformed is an error, never a silent
    /// fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, or
    /// `Error::IllegalArgument` for out-of-range values.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// As for `load`.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let mut config: Self = toml::from_str(content)?;
        config.modules.entry(String::new()).or_insert_with(|| return PathBuf::from("."));
        config.validate()?;
        return Ok(config);
    }

    /// Tunables for the metadata service.
    pub const fn service_settings(&self) -> ServiceSettings {
        return ServiceSettings {
            cache_capacity: self.cache_capacity,
            max_name_attempts: self.max_name_attempts,
            max_retry_rounds: self.max_retry_rounds,
        };
    }

    /// Reject values the engine cannot work with.
    fn validate(&self) -> Result<(), Error> {
        if self.cache_capacity == 0 {
            return Err(Error::IllegalArgument { reason: "cache_capacity must be at least 1".to_string() });
        }
        if self.artifact_suffix.is_empty() {
            return Err(Error::IllegalArgument {
                reason: "artifact_suffix must not be empty; artifacts would shadow their governors".to_string(),
            });
        }
        if let Some((name, dir)) = self.modules.iter().find(|(_, dir)| return dir.is_absolute()) {
            return Err(Error::IllegalArgument {
                reason: format!("module `{name}` must be relative to the project root, got {}", dir.display()),
            });
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.modules.get(""), Some(&PathBuf::from(".")));
    }

    #[test]
    fn keys_override_defaults_and_keep_the_root_module() {
        let config = Config::parse(
            "artifact_suffix = \"_Roo\"\nlog_format = \"json\"\nmax_name_attempts = 3\n\n[modules]\ncore = \"core\"\n",
        )
        .unwrap();
        assert_eq!(config.artifact_suffix, "_Roo");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.service_settings().max_name_attempts, 3);
        assert_eq!(config.modules.len(), 2);
    }

    #[test]
    fn malformed_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "cache_capacity = \"lots\"").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
        assert!(matches!(Config::parse("unknown_key = 1"), Err(Error::TomlDe(_))));
        assert!(matches!(Config::parse("cache_capacity = 0"), Err(Error::IllegalArgument { .. })));
    }
}

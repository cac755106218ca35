//!
//! # Plugin Configuration
//!
//! The plugin reads an optional TOML file named by the `PHASOR_SQLITE_CONFIG`
//! environment variable when the host loads it. Every field is optional and
//! unknown fields are rejected, so a typo is reported instead of ignored.
//!
//! ## Example
//!
//! ```toml
//! [open]
//! read_only = false
//! create = true
//! uri = true
//! busy_timeout_ms = 5000
//!
//! [log]
//! level = "debug"
//! ```
//!
//! A missing or broken file never stops the plugin from loading: the entry
//! point logs the problem and continues with defaults. Once installed, the
//! configuration is fixed for the life of the process.
//!

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub const CONFIG_ENV: &str = "PHASOR_SQLITE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid log level '{0}'")]
    InvalidLevel(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginConfig {
    pub open: OpenConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenConfig {
    pub read_only: bool,
    pub create: bool,
    pub uri: bool,
    pub busy_timeout_ms: u64,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            create: true,
            uri: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl OpenConfig {
    /// Flags for `sqlite3_open_v2`.
    ///
    /// Connections are opened without SQLite's internal mutex; the plugin
    /// serializes all access to a connection itself.
    pub fn flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if self.create {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }
        if self.uri {
            flags |= OpenFlags::SQLITE_OPEN_URI;
        }
        flags
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LogConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::InvalidLevel(self.level.clone()))
    }
}

pub fn parse_config_str(content: &str) -> Result<PluginConfig, ConfigError> {
    let config: PluginConfig = toml::from_str(content)?;
    config.log.level_filter()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<PluginConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&content)
}

/// Load the file named by `PHASOR_SQLITE_CONFIG`, defaults when unset
pub fn load_from_env() -> Result<PluginConfig, ConfigError> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => load_config(Path::new(&path)),
        _ => Ok(PluginConfig::default()),
    }
}

static CONFIG: OnceLock<PluginConfig> = OnceLock::new();

/// Configuration from the environment, or defaults plus the reason they were used
pub fn load_or_default() -> (PluginConfig, Option<ConfigError>) {
    match load_from_env() {
        Ok(config) => (config, None),
        Err(e) => (PluginConfig::default(), Some(e)),
    }
}

/// Install the process configuration from the environment.
///
/// Only the first call loads; the error, if any, is returned to that caller
/// so it can be logged once logging is up.
pub fn init() -> (&'static PluginConfig, Option<ConfigError>) {
    let mut problem = None;
    let config = CONFIG.get_or_init(|| {
        let (config, err) = load_or_default();
        problem = err;
        config
    });
    (config, problem)
}

/// The installed configuration, defaults if the entry point has not run
pub fn current() -> &'static PluginConfig {
    CONFIG.get_or_init(PluginConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_is_default() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config, PluginConfig::default());
        assert!(config.open.create);
        assert!(!config.open.read_only);
        assert_eq!(config.open.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.log.level_filter().unwrap(), LevelFilter::WARN);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config_str(
            r#"
[open]
read_only = true
busy_timeout_ms = 250

[log]
level = "DEBUG"
"#,
        )
        .unwrap();
        assert!(config.open.read_only);
        assert!(config.open.create);
        assert_eq!(config.open.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.log.level_filter().unwrap(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = parse_config_str("[open]\nread_onyl = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("read_onyl"));
    }

    #[test]
    fn test_invalid_level_rejected() {
        let err = parse_config_str("[log]\nlevel = \"loud\"\n").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Invalid log level 'loud'");
    }

    #[test]
    fn test_flags() {
        let flags = OpenConfig::default().flags();
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE));
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX));

        let read_only = OpenConfig {
            read_only: true,
            ..OpenConfig::default()
        }
        .flags();
        assert!(read_only.contains(OpenFlags::SQLITE_OPEN_READ_ONLY));
        assert!(!read_only.contains(OpenFlags::SQLITE_OPEN_CREATE));

        let no_create = OpenConfig {
            create: false,
            uri: false,
            ..OpenConfig::default()
        }
        .flags();
        assert!(!no_create.contains(OpenFlags::SQLITE_OPEN_CREATE));
        assert!(!no_create.contains(OpenFlags::SQLITE_OPEN_URI));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[open]\ncreate = false").unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(!config.open.create);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    // The only test in this binary that touches the variable.
    #[test]
    fn test_env_file_errors_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[open\nread_only = ").unwrap();

        unsafe { std::env::set_var(CONFIG_ENV, &broken) };
        assert!(matches!(load_from_env(), Err(ConfigError::Parse(_))));
        let (config, problem) = load_or_default();
        assert_eq!(config, PluginConfig::default());
        assert!(matches!(problem, Some(ConfigError::Parse(_))));

        unsafe { std::env::set_var(CONFIG_ENV, dir.path().join("absent.toml")) };
        assert!(matches!(load_from_env(), Err(ConfigError::Read { .. })));
        let (config, problem) = load_or_default();
        assert_eq!(config, PluginConfig::default());
        assert!(matches!(problem, Some(ConfigError::Read { .. })));

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[open]\nbusy_timeout_ms = 10\n").unwrap();
        unsafe { std::env::set_var(CONFIG_ENV, &good) };
        let (config, problem) = load_or_default();
        assert!(problem.is_none());
        assert_eq!(config.open.busy_timeout(), Duration::from_millis(10));

        unsafe { std::env::remove_var(CONFIG_ENV) };
        assert_eq!(load_from_env().unwrap(), PluginConfig::default());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = PluginConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(parse_config_str(&text).unwrap(), config);
    }
}

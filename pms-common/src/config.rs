//! Bootstrap configuration loading and database path resolution
//!
//! Resolution priority for every bootstrap value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: defaults are used and a warning is
//! logged. An explicitly requested file that is missing or malformed is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port for the review service
pub const DEFAULT_PORT: u16 = 5780;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Side-channel (email) delivery
    #[serde(default)]
    pub mail: MailConfig,

    /// Reminder sweep schedule
    #[serde(default)]
    pub reminders: ReminderConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Mail relay configuration
///
/// Without a `relay_url` messages are only written to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub relay_url: Option<String>,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    #[serde(default = "default_mail_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            from_address: default_from_address(),
            timeout_secs: default_mail_timeout_secs(),
        }
    }
}

/// Reminder sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Days before the period end at which reminders start
    #[serde(default = "default_grace_days")]
    pub grace_days: i64,

    /// Interval between sweeps. Daily by default; the sweep keeps no
    /// "already reminded" marker so this bounds duplicate sends.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grace_days: default_grace_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_from_address() -> String {
    "no-reply@pms.local".to_string()
}

fn default_mail_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_grace_days() -> i64 {
    2
}

fn default_sweep_interval_secs() -> u64 {
    24 * 60 * 60
}

/// Load TOML bootstrap configuration
///
/// With `explicit_path` the file must exist and parse. Without it the
/// platform config file is tried and defaults are used when it is absent.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit_path {
        return read_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => read_toml_config(&path),
        Some(path) => {
            warn!(
                "No config file at {}, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: TomlConfig = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write a TOML configuration file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content)?;

    Ok(())
}

/// Resolve database path following the priority order
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.database_path {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_database_path()
}

/// Resolve HTTP port; `cli_or_env` comes from clap, which already merges both
pub fn resolve_port(cli_or_env: Option<u16>, toml_config: &TomlConfig) -> u16 {
    cli_or_env.or(toml_config.port).unwrap_or(DEFAULT_PORT)
}

/// Platform configuration file location
///
/// Linux checks `~/.config/pms/config.toml` then `/etc/pms/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("pms").join("config.toml"));

    if cfg!(target_os = "linux") {
        if let Some(path) = &user_config {
            if path.exists() {
                return user_config;
            }
        }
        let system_config = PathBuf::from("/etc/pms/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    user_config
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pms").join("pms.db"))
        .unwrap_or_else(|| PathBuf::from("./pms_data/pms.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_port_prefers_cli() {
        let toml_config = TomlConfig {
            port: Some(6000),
            ..Default::default()
        };
        assert_eq!(resolve_port(Some(7000), &toml_config), 7000);
        assert_eq!(resolve_port(None, &toml_config), 6000);
        assert_eq!(resolve_port(None, &TomlConfig::default()), DEFAULT_PORT);
    }

    #[test]
    fn test_default_database_path_has_file_name() {
        let path = default_database_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("pms.db"));
    }

    #[test]
    fn test_reminder_defaults() {
        let reminders = ReminderConfig::default();
        assert!(reminders.enabled);
        assert_eq!(reminders.grace_days, 2);
        assert_eq!(reminders.sweep_interval_secs, 86_400);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            port = 5999

            [mail]
            relay_url = "http://localhost:8025/send"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(5999));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.mail.relay_url.as_deref(), Some("http://localhost:8025/send"));
        assert_eq!(config.mail.from_address, "no-reply@pms.local");
        assert_eq!(config.reminders.grace_days, 2);
    }
}

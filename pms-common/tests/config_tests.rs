//! Integration tests for bootstrap configuration
//!
//! Tests cover:
//! - Priority order CLI > ENV > TOML > default for the database path
//! - Missing explicit config file is an error, missing default file is not
//! - TOML write/read through the public helpers
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.

use pms_common::config::{
    default_database_path, load_toml_config, resolve_database_path, write_toml_config,
    MailConfig, TomlConfig,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENV_VAR: &str = "PMS_TEST_DATABASE";

#[test]
#[serial]
fn test_database_path_cli_wins() {
    env::set_var(ENV_VAR, "/tmp/pms-env.db");
    let toml_config = TomlConfig {
        database_path: Some(PathBuf::from("/tmp/pms-toml.db")),
        ..Default::default()
    };

    let path = resolve_database_path(Some(Path::new("/tmp/pms-cli.db")), ENV_VAR, &toml_config);
    assert_eq!(path, PathBuf::from("/tmp/pms-cli.db"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_database_path_env_beats_toml() {
    env::set_var(ENV_VAR, "/tmp/pms-env.db");
    let toml_config = TomlConfig {
        database_path: Some(PathBuf::from("/tmp/pms-toml.db")),
        ..Default::default()
    };

    let path = resolve_database_path(None, ENV_VAR, &toml_config);
    assert_eq!(path, PathBuf::from("/tmp/pms-env.db"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_database_path_toml_then_default() {
    env::remove_var(ENV_VAR);

    let toml_config = TomlConfig {
        database_path: Some(PathBuf::from("/tmp/pms-toml.db")),
        ..Default::default()
    };
    assert_eq!(
        resolve_database_path(None, ENV_VAR, &toml_config),
        PathBuf::from("/tmp/pms-toml.db")
    );

    assert_eq!(
        resolve_database_path(None, ENV_VAR, &TomlConfig::default()),
        default_database_path()
    );
}

#[test]
fn test_explicit_missing_config_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let err = load_toml_config(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_malformed_config_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let err = load_toml_config(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_written_config_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let config = TomlConfig {
        port: Some(5999),
        database_path: Some(PathBuf::from("/var/lib/pms/pms.db")),
        mail: MailConfig {
            relay_url: Some("http://mail.internal/send".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    write_toml_config(&config, &path).unwrap();

    let loaded = load_toml_config(Some(&path)).unwrap();
    assert_eq!(loaded.port, Some(5999));
    assert_eq!(loaded.database_path, Some(PathBuf::from("/var/lib/pms/pms.db")));
    assert_eq!(loaded.mail.relay_url.as_deref(), Some("http://mail.internal/send"));
    assert_eq!(loaded.reminders.grace_days, 2);
}

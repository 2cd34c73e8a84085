//! Daemon configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cloudflight_core::SessionConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "CLOUDFLIGHT_CONFIG";

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Headset session settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON instead of plain text
    #[serde(default)]
    pub json_logs: bool,
    /// Shut down when stdin closes or receives a `shutdown` line
    #[serde(default)]
    pub watch_stdin: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), json_logs: false, watch_stdin: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    let config_path = match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None => config_path()?,
    };
    load_config_from(&config_path)
}

/// Load configuration from a specific file, falling back to defaults if it
/// does not exist.
pub fn load_config_from(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;
        config
            .session
            .validate()
            .with_context(|| format!("Invalid session settings in {config_path:?}"))?;
        Ok(config)
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "cloudflight", "Cloudflight")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.daemon.log_level, "info");
        assert!(!config.daemon.watch_stdin);
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[daemon]
log_level = "debug"
json_logs = true
watch_stdin = true

[session]
debug = true
update_delay_ms = 60000
dedupe = false
battery_min_interval_ms = 30000
"#
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.daemon.log_level, "debug");
        assert!(config.daemon.json_logs);
        assert!(config.daemon.watch_stdin);
        assert!(config.session.debug);
        assert_eq!(config.session.update_delay_ms, 60_000);
        assert!(!config.session.dedupe);
        assert_eq!(config.session.battery_min_interval_ms, 30_000);
    }

    #[test]
    fn test_partial_session_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nupdateDelay = 1000").unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.session.update_delay_ms, 1000);
        assert!(config.session.dedupe);
        assert_eq!(config.daemon.log_level, "info");
    }

    #[test]
    fn test_invalid_files_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session\nbroken").unwrap();
        assert!(load_config_from(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nupdate_delay_ms = 0").unwrap();
        assert!(load_config_from(file.path()).is_err());
    }
}

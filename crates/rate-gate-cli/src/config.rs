use anyhow::{Context, Result};
use rate_gate_core::keys::DEFAULT_KEY_PREFIX;
use rate_gate_core::RatingSettingsFile;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REACHABILITY_HOST: &str = "itunes.apple.com:443";
pub const DEFAULT_REACHABILITY_TIMEOUT_MS: u64 = 1_500;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub store_path: Option<PathBuf>,
    pub app_version: Option<String>,
    pub key_prefix: Option<String>,
    pub reachability_host: Option<String>,
    pub reachability_timeout_ms: Option<u64>,
    pub rating: RatingSettingsFile,
}

impl CliConfig {
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| state_dir().join("rate-gate/prefs.sqlite3"))
    }

    pub fn key_prefix(&self) -> &str {
        self.key_prefix.as_deref().unwrap_or(DEFAULT_KEY_PREFIX)
    }

    pub fn reachability_host(&self) -> &str {
        self.reachability_host
            .as_deref()
            .unwrap_or(DEFAULT_REACHABILITY_HOST)
    }

    pub fn reachability_timeout_ms(&self) -> u64 {
        self.reachability_timeout_ms
            .unwrap_or(DEFAULT_REACHABILITY_TIMEOUT_MS)
    }
}

/// Missing file means defaults; a malformed one is an error.
pub fn load_config(path: &Path) -> Result<CliConfig> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config {}", path.display()))
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var("RATE_GATE_CONFIG") {
        return PathBuf::from(path);
    }
    config_dir().join("rate-gate/config.toml")
}

fn state_dir() -> PathBuf {
    if let Ok(path) = env::var("XDG_STATE_HOME") {
        return PathBuf::from(path);
    }
    home_dir().join(".local/state")
}

fn config_dir() -> PathBuf {
    if let Ok(path) = env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(path);
    }
    home_dir().join(".config")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("temp dir");
        let config = load_config(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.key_prefix(), "rate-gate.");
        assert_eq!(config.reachability_host(), "itunes.apple.com:443");
        assert_eq!(config.reachability_timeout_ms(), 1_500);
    }

    #[test]
    fn parses_host_and_rating_sections() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            store_path = "/tmp/prefs.sqlite3"
            app_version = "2.4.0"
            reachability_timeout_ms = 250

            [rating]
            app_id = 12345
            app_name = "Atlas"
            days_until_prompt = 7
            "#,
        )
        .expect("write config");

        let config = load_config(&path).expect("load");
        assert_eq!(config.store_path(), PathBuf::from("/tmp/prefs.sqlite3"));
        assert_eq!(config.app_version.as_deref(), Some("2.4.0"));
        assert_eq!(config.reachability_timeout_ms(), 250);

        let settings = config.rating.into_settings("fallback");
        assert_eq!(settings.app_id, 12345);
        assert_eq!(settings.days_until_prompt, 7);
        assert_eq!(settings.message_title, "Rate Atlas");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "store_path = [").expect("write config");
        assert!(load_config(&path).is_err());
    }
}

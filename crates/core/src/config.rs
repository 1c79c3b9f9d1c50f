//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::store::FileStore;

/// Directory under `~/.config` holding `config.toml`.
pub const CONFIG_DIR: &str = "game-backlog";
/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Runtime settings loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the persisted games, tags and preferences.
    pub data_dir: PathBuf,
    /// Quiet period before a search edit is committed.
    pub search_debounce_ms: u64,
    /// Quiet period before a notes edit is committed.
    pub notes_debounce_ms: u64,
    /// File name used for exports and imports inside `data_dir`.
    pub export_file_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: FileStore::default_root(),
            search_debounce_ms: 200,
            notes_debounce_ms: 800,
            export_file_name: "backlog-export.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the default configuration file, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Config::builder()
            .add_source(File::from(path.clone()).required(false))
            .build()
            .with_context(|| format!("failed to load config {}", path.display()))?;
        settings
            .try_deserialize()
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Search debounce as a duration.
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Notes debounce as a duration.
    pub fn notes_debounce(&self) -> Duration {
        Duration::from_millis(self.notes_debounce_ms)
    }

    /// Default export/import file.
    pub fn export_path(&self) -> PathBuf {
        self.data_dir.join(&self.export_file_name)
    }

    /// Directory for log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Path of the configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write a commented default configuration file if none exists.
pub fn ensure_default_config() -> Result<()> {
    write_config_if_missing(&config_path(), &AppConfig::default())
}

fn write_config_if_missing(path: &Path, config: &AppConfig) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let body = toml::to_string_pretty(config)
        .context("failed to serialize default config")?;
    let contents = format!("# Game backlog settings\n{body}");
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.search_debounce_ms, 200);
        assert_eq!(config.notes_debounce_ms, 800);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"/tmp/backlog\"\nsearch_debounce_ms = 50\n",
        )?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/tmp/backlog"));
        assert_eq!(config.search_debounce(), Duration::from_millis(50));
        assert_eq!(config.notes_debounce_ms, 800);
        assert_eq!(
            config.export_path(),
            PathBuf::from("/tmp/backlog/backlog-export.json")
        );
        Ok(())
    }

    #[test]
    fn default_config_file_parses_back() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig {
            data_dir: dir.path().join("jeux-vidéo \"quoted\""),
            ..AppConfig::default()
        };
        let path = dir.path().join("config.toml");
        write_config_if_missing(&path, &config)?;

        let loaded = AppConfig::load_from(&path)?;
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.export_file_name, "backlog-export.json");

        write_config_if_missing(&path, &AppConfig::default())?;
        assert_eq!(AppConfig::load_from(&path)?.data_dir, config.data_dir);
        Ok(())
    }
}

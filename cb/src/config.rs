//! Configuration for channelbus

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::channel::ChannelOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the channel manifest
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,

    /// Nested raise depth that triggers a warning (0 disables)
    #[serde(default = "default_reentrancy_warn_depth")]
    pub reentrancy_warn_depth: usize,

    /// Log level used when --log-level is not given
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_manifest_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("channelbus")
        .join("channels.yml")
}

fn default_reentrancy_warn_depth() -> usize {
    crate::DEFAULT_REENTRANCY_WARN_DEPTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_path: default_manifest_path(),
            reentrancy_warn_depth: default_reentrancy_warn_depth(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path)
                .context(format!("Failed to load config from {}", config_path.display()));
        }

        // Try default locations
        let default_paths = [
            Some(PathBuf::from("channelbus.yml")),
            dirs::config_dir().map(|p| p.join("channelbus").join("config.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
            }
        }

        Ok(Config::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Options applied to every channel the catalog creates
    pub fn channel_options(&self) -> ChannelOptions {
        ChannelOptions {
            reentrancy_warn_depth: self.reentrancy_warn_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.manifest_path.ends_with("channelbus/channels.yml"));
        assert_eq!(config.reentrancy_warn_depth, crate::DEFAULT_REENTRANCY_WARN_DEPTH);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("log_level: debug\n").unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.reentrancy_warn_depth, crate::DEFAULT_REENTRANCY_WARN_DEPTH);
    }

    #[test]
    fn test_save_and_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("channelbus.yml");

        let config = Config {
            manifest_path: temp.path().join("channels.yml"),
            reentrancy_warn_depth: 4,
            log_level: Some("trace".to_string()),
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.channel_options().reentrancy_warn_depth, 4);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::store::quota::BYTES_PER_MB;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
    pub quota_mb: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: None,
            quota_mb: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NoveltyConfig {
    /// How long a listing stays "new" after it is first seen ("48h", "3d", ...).
    pub window: String,
    pub prune_after_months: u32,
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        NoveltyConfig {
            window: "48h".to_string(),
            prune_after_months: 12,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub top_deals: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig { top_deals: 10 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub novelty: NoveltyConfig,
    pub analysis: AnalysisConfig,
}

impl Config {
    /// ~/.config/estatewatch/config.toml or platform equivalent
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "estatewatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location; a missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        // surface a bad window at load time rather than on first use
        config.novelty_window()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, window: Option<String>) -> Self {
        if let Some(dir) = data_dir {
            self.storage.data_dir = Some(dir);
        }
        if let Some(window) = window {
            self.novelty.window = window;
        }
        self
    }

    pub fn novelty_window(&self) -> Result<chrono::Duration, ConfigError> {
        parse_window(&self.novelty.window)
    }

    pub fn ceiling_bytes(&self) -> u64 {
        self.storage.quota_mb.saturating_mul(BYTES_PER_MB)
    }
}

pub fn parse_window(value: &str) -> Result<chrono::Duration, ConfigError> {
    let std_duration = humantime::parse_duration(value).map_err(|source| ConfigError::InvalidWindow {
        value: value.to_string(),
        source,
    })?;

    chrono::Duration::from_std(std_duration).map_err(|_| ConfigError::WindowOutOfRange(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.storage.quota_mb, 50);
        assert_eq!(config.ceiling_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.novelty_window().unwrap(), chrono::Duration::hours(48));
        assert_eq!(config.novelty.prune_after_months, 12);
        assert_eq!(config.analysis.top_deals, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [novelty]
            window = "3d"

            [storage]
            quota_mb = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.novelty_window().unwrap(), chrono::Duration::days(3));
        assert_eq!(config.ceiling_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.novelty.prune_after_months, 12);
        assert_eq!(config.analysis.top_deals, 10);
    }

    #[test]
    fn invalid_window_is_rejected() {
        let result = Config::from_toml("[novelty]\nwindow = \"soon\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidWindow { .. })));
    }

    #[test]
    fn invalid_toml_is_rejected() {
        assert!(matches!(Config::from_toml("[storage"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = Config::default().with_overrides(Some(PathBuf::from("/tmp/ew")), Some("1w".into()));
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/ew")));
        assert_eq!(config.novelty_window().unwrap(), chrono::Duration::weeks(1));
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis]\ntop_deals = 3\n").unwrap();

        assert_eq!(Config::load_from(&path).unwrap().analysis.top_deals, 3);
        assert!(matches!(
            Config::load_from(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}

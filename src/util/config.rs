use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::dates::{self, Clock, DateLibrary, Thresholds};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub relative: Thresholds,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    #[serde(default = "default_locale")]
    pub default: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    #[serde(default)]
    pub omit_suffix: bool,
}

fn default_locale() -> String {
    dates::DEFAULT_LOCALE.to_string()
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: default_locale(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::read(path);
        }

        // Search candidate paths in order
        let mut candidates = Vec::new();

        // 1. ~/.config/datepipe/config.toml
        if let Some(home) = std::env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join(".config/datepipe/config.toml"));
        }

        // 2. Platform-specific path from `directories` crate
        if let Some(proj_dirs) = ProjectDirs::from("", "", "datepipe") {
            candidates.push(proj_dirs.config_dir().join("config.toml"));
        }

        for config_path in &candidates {
            if config_path.exists() {
                return Self::read(config_path);
            }
        }

        Ok(AppConfig::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")
    }

    /// Build the date library this config describes.
    pub fn date_library(&self, clock: Arc<dyn Clock>) -> dates::Result<DateLibrary> {
        let library = DateLibrary::new(clock, self.relative);
        library.set_locale(&self.locale.default)?;
        Ok(library)
    }

    pub fn log_dir(&self) -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "datepipe") {
            return proj_dirs.data_dir().join("logs");
        }
        PathBuf::from(".local/share/datepipe/logs")
    }
}

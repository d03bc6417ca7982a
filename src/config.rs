// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON at `<config dir>/speedlens/config.json`. Every field has
//! a default, so a partial file is fine and a missing one means defaults.

use crate::constants;
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::{EncodingFormat, EncodingQuality, PhotoEncoder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const APP_DIR: &str = "speedlens";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where exported photos go (default: `<Pictures>/speedlens`)
    pub photo_dir: Option<PathBuf>,
    /// Filter label auto-hide delay in milliseconds
    pub label_hide_ms: u64,
    /// Keep every n-th preview pixel in each direction
    pub preview_downsample: u32,
    /// Async runtime worker threads
    pub worker_threads: usize,
    /// Threads for decoding, filtering and encoding
    pub blocking_threads: usize,
    pub export_format: EncodingFormat,
    pub export_quality: EncodingQuality,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            photo_dir: None,
            label_hide_ms: constants::label::HIDE_DELAY.as_millis() as u64,
            preview_downsample: 2,
            worker_threads: 2,
            blocking_threads: 4,
            export_format: EncodingFormat::default(),
            export_quality: EncodingQuality::default(),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults on any
    /// problem
    pub fn load() -> Self {
        let Some(path) = default_path() else {
            debug!("No config directory on this system, using defaults");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load from `path`. A missing file yields defaults; a malformed one is
    /// an error.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Write to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = default_path()
            .ok_or_else(|| AppError::Config("No config directory on this system".into()))?;
        self.save_to(&path)
    }

    pub fn label_hide_delay(&self) -> Duration {
        Duration::from_millis(self.label_hide_ms)
    }

    /// Configured photo directory, or `<Pictures>/speedlens`
    pub fn photo_directory(&self) -> PathBuf {
        self.photo_dir.clone().unwrap_or_else(default_photo_dir)
    }

    pub fn encoder(&self) -> PhotoEncoder {
        PhotoEncoder::new(self.export_format, self.export_quality)
    }
}

/// `<config dir>/speedlens/config.json`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// `<Pictures>/speedlens`, or `~/Pictures/speedlens` when the platform has
/// no pictures directory
pub fn default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

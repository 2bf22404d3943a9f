// SPDX-License-Identifier: GPL-3.0-only

//! Persistent configuration
//!
//! Stored as JSON under the platform config directory. Every field has a
//! default so that older files keep loading after new settings are added.

use crate::constants::{APP_ID, CAPTURES_DIR_NAME, CONFIG_FILE_NAME, LensProfile};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Zoom-to-device mapping thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Factors below this use the ultra-wide module
    pub ultra_wide_threshold: f64,
    /// Factors at or above this use the telephoto module
    pub telephoto_threshold: f64,
    /// Extra distance a factor must travel back across a threshold before
    /// the session switches down to the wider module again
    pub switch_hysteresis: f64,
    /// Fixed zoom ratio used while macro mode is active
    pub macro_ratio: f64,
    /// Ramp rate for animated zoom (factor doublings per second)
    pub ramp_rate: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            ultra_wide_threshold: 1.0,
            telephoto_threshold: 4.0,
            switch_hysteresis: 0.05,
            macro_ratio: 2.0,
            ramp_rate: 8.0,
        }
    }
}

/// Render tier bounds and JPEG qualities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Longest edge of the preview tier in pixels
    pub preview_max_dimension: u32,
    /// Longest edge of the thumbnail tier in pixels
    pub thumbnail_max_dimension: u32,
    /// JPEG quality (1-100) for the full-resolution tier
    pub full_quality: u8,
    pub preview_quality: u8,
    pub thumbnail_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_max_dimension: 1600,
            thumbnail_max_dimension: 512,
            full_quality: 95,
            preview_quality: 85,
            thumbnail_quality: 75,
        }
    }
}

/// Orientation sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Dead-zone threshold in g; an axis must exceed this to decide
    pub threshold: f64,
    /// Sampling period in milliseconds
    pub sample_interval_ms: u64,
}

impl OrientationConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            sample_interval_ms: 100,
        }
    }
}

/// Tap-to-focus timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Delay before a tapped focus point reverts to continuous auto
    pub auto_revert_ms: u64,
    /// Hold time that turns a press into a focus/exposure lock
    pub long_press_ms: u64,
    /// Movement (in points) that cancels a long press
    pub long_press_slop: f64,
}

impl FocusConfig {
    pub fn auto_revert(&self) -> Duration {
        Duration::from_millis(self.auto_revert_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            auto_revert_ms: 3000,
            long_press_ms: 2000,
            long_press_slop: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub zoom: ZoomConfig,
    pub render: RenderConfig,
    pub orientation: OrientationConfig,
    pub focus: FocusConfig,
    /// Directory for captured assets (None = platform data directory)
    pub capture_dir: Option<PathBuf>,
    /// Attach the location snapshot to new captures
    pub store_location: bool,
    /// Lens preset selected at startup
    pub default_lens: LensProfile,
    /// How long the presentation layer shows the saved state
    pub saved_display_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zoom: ZoomConfig::default(),
            render: RenderConfig::default(),
            orientation: OrientationConfig::default(),
            focus: FocusConfig::default(),
            capture_dir: None,
            store_location: true,
            default_lens: LensProfile::default(),
            saved_display_ms: 1500,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults
    ///
    /// A missing or unreadable file is not an error; the defaults are used
    /// and a warning is logged for anything other than a missing file.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            warn!("No config directory available, using defaults");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&contents)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::path()
            .ok_or_else(|| AppError::Config("No config directory available".to_string()))?;
        self.save_to(&path)
    }

    /// Save to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Config(format!("{}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Directory captured assets are written to
    pub fn resolved_capture_dir(&self) -> PathBuf {
        if let Some(dir) = &self.capture_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_ID)
            .join(CAPTURES_DIR_NAME)
    }

    pub fn saved_display(&self) -> Duration {
        Duration::from_millis(self.saved_display_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"zoom":{"telephoto_threshold":5.0}}"#)
            .expect("partial config parses");
        assert_eq!(config.zoom.telephoto_threshold, 5.0);
        assert_eq!(config.zoom.ultra_wide_threshold, 1.0);
        assert_eq!(config.render, RenderConfig::default());
        assert!(config.store_location);
    }

    #[test]
    fn test_explicit_capture_dir_wins() {
        let config = Config {
            capture_dir: Some(PathBuf::from("/tmp/shots")),
            ..Default::default()
        };
        assert_eq!(config.resolved_capture_dir(), PathBuf::from("/tmp/shots"));
    }

    #[test]
    fn test_default_capture_dir_ends_with_captures() {
        let dir = Config::default().resolved_capture_dir();
        assert!(dir.ends_with(Path::new(APP_ID).join(CAPTURES_DIR_NAME)));
    }
}

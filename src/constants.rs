// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Product tables (lens presets, shutter speeds, white balance presets) and
//! the slider ranges of the manual controls. Thresholds that get tuned per
//! device live in [`crate::config`] instead.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application identifier used for config and data directories
pub const APP_ID: &str = "mobile-camera";

/// Name of the directory holding captured assets
pub const CAPTURES_DIR_NAME: &str = "Captures";

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Aperture reported when a device does not publish one
pub const DEFAULT_APERTURE: f64 = 1.8;

/// Lens presets, named by their full-frame equivalent focal length
///
/// Zoom factors are relative to the wide (24mm) module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LensProfile {
    /// 13mm - ultra-wide module
    UltraWide,
    /// 24mm - main wide module
    Wide,
    /// 35mm - digital crop on the wide module
    #[default]
    Standard,
    /// 50mm - telephoto if available
    Portrait,
    /// 100mm - telephoto if available
    Telephoto,
}

impl LensProfile {
    /// All presets, widest first
    pub const ALL: [LensProfile; 5] = [
        LensProfile::UltraWide,
        LensProfile::Wide,
        LensProfile::Standard,
        LensProfile::Portrait,
        LensProfile::Telephoto,
    ];

    /// Equivalent focal length in millimetres
    pub fn focal_length(&self) -> u32 {
        match self {
            LensProfile::UltraWide => 13,
            LensProfile::Wide => 24,
            LensProfile::Standard => 35,
            LensProfile::Portrait => 50,
            LensProfile::Telephoto => 100,
        }
    }

    /// Label stored on captured assets (e.g. "35mm")
    pub fn label(&self) -> String {
        format!("{}mm", self.focal_length())
    }

    /// Zoom factor relative to the 24mm wide module
    pub fn zoom_factor(&self) -> f64 {
        match self {
            LensProfile::UltraWide => 0.5,
            LensProfile::Wide => 1.0,
            LensProfile::Standard => 1.5,
            LensProfile::Portrait => 2.1,
            LensProfile::Telephoto => 4.2,
        }
    }
}

/// Look names offered in the filter sheet
///
/// Only the name is recorded on the asset; pixels are not altered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterLut {
    #[default]
    None,
    Cinematic,
    Vivid,
    Noir,
    ClassicFilm,
}

impl FilterLut {
    pub const ALL: [FilterLut; 5] = [
        FilterLut::None,
        FilterLut::Cinematic,
        FilterLut::Vivid,
        FilterLut::Noir,
        FilterLut::ClassicFilm,
    ];

    /// Get display name for the filter
    pub fn display_name(&self) -> &'static str {
        match self {
            FilterLut::None => "None",
            FilterLut::Cinematic => "Cinematic",
            FilterLut::Vivid => "Vivid",
            FilterLut::Noir => "Noir",
            FilterLut::ClassicFilm => "Classic Film",
        }
    }
}

/// Shutter speeds offered by the manual shutter wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShutterSpeed {
    OneOver4000,
    OneOver2000,
    OneOver1000,
    OneOver500,
    OneOver250,
    #[default]
    OneOver125,
    OneOver60,
    OneOver30,
    OneOver15,
    OneOver8,
    OneOver4,
    OneOver2,
    One,
}

impl ShutterSpeed {
    /// All speeds, fastest first
    pub const ALL: [ShutterSpeed; 13] = [
        ShutterSpeed::OneOver4000,
        ShutterSpeed::OneOver2000,
        ShutterSpeed::OneOver1000,
        ShutterSpeed::OneOver500,
        ShutterSpeed::OneOver250,
        ShutterSpeed::OneOver125,
        ShutterSpeed::OneOver60,
        ShutterSpeed::OneOver30,
        ShutterSpeed::OneOver15,
        ShutterSpeed::OneOver8,
        ShutterSpeed::OneOver4,
        ShutterSpeed::OneOver2,
        ShutterSpeed::One,
    ];

    /// Denominator of the 1/x notation (1 for a full second)
    fn denominator(&self) -> u32 {
        match self {
            ShutterSpeed::OneOver4000 => 4000,
            ShutterSpeed::OneOver2000 => 2000,
            ShutterSpeed::OneOver1000 => 1000,
            ShutterSpeed::OneOver500 => 500,
            ShutterSpeed::OneOver250 => 250,
            ShutterSpeed::OneOver125 => 125,
            ShutterSpeed::OneOver60 => 60,
            ShutterSpeed::OneOver30 => 30,
            ShutterSpeed::OneOver15 => 15,
            ShutterSpeed::OneOver8 => 8,
            ShutterSpeed::OneOver4 => 4,
            ShutterSpeed::OneOver2 => 2,
            ShutterSpeed::One => 1,
        }
    }

    /// Display string ("1/125", or 1" for one second)
    pub fn display_string(&self) -> String {
        match self {
            ShutterSpeed::One => "1\"".to_string(),
            other => format!("1/{}", other.denominator()),
        }
    }

    /// Exposure duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.denominator() as f64)
    }

    /// Look up a wheel position
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Nearest table entry for an arbitrary exposure duration
    ///
    /// Compared in log space so that 1/90 lands between 1/60 and 1/125
    /// the way a photographer would read it.
    pub fn nearest(duration: Duration) -> Self {
        let target = duration.as_secs_f64().max(f64::MIN_POSITIVE).ln();
        Self::ALL
            .into_iter()
            .min_by(|a, b| {
                let da = (a.duration().as_secs_f64().ln() - target).abs();
                let db = (b.duration().as_secs_f64().ln() - target).abs();
                da.total_cmp(&db)
            })
            .unwrap_or_default()
    }
}

/// White balance presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WhiteBalancePreset {
    #[default]
    Auto,
    Daylight,
    Cloudy,
    Tungsten,
    Fluorescent,
    Shade,
}

impl WhiteBalancePreset {
    pub const ALL: [WhiteBalancePreset; 6] = [
        WhiteBalancePreset::Auto,
        WhiteBalancePreset::Daylight,
        WhiteBalancePreset::Cloudy,
        WhiteBalancePreset::Tungsten,
        WhiteBalancePreset::Fluorescent,
        WhiteBalancePreset::Shade,
    ];

    /// Colour temperature in Kelvin, `None` for continuous auto
    pub fn temperature(&self) -> Option<f64> {
        match self {
            WhiteBalancePreset::Auto => None,
            WhiteBalancePreset::Daylight => Some(5600.0),
            WhiteBalancePreset::Cloudy => Some(6500.0),
            WhiteBalancePreset::Tungsten => Some(3200.0),
            WhiteBalancePreset::Fluorescent => Some(4000.0),
            WhiteBalancePreset::Shade => Some(7500.0),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WhiteBalancePreset::Auto => "Auto",
            WhiteBalancePreset::Daylight => "Daylight",
            WhiteBalancePreset::Cloudy => "Cloudy",
            WhiteBalancePreset::Tungsten => "Tungsten",
            WhiteBalancePreset::Fluorescent => "Fluorescent",
            WhiteBalancePreset::Shade => "Shade",
        }
    }
}

/// Manual controls exposed on the control wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualControl {
    Exposure,
    Temperature,
    ShutterSpeed,
    Iso,
}

impl ManualControl {
    pub const ALL: [ManualControl; 4] = [
        ManualControl::Exposure,
        ManualControl::Temperature,
        ManualControl::ShutterSpeed,
        ManualControl::Iso,
    ];

    /// Wheel range; for the shutter this is an index into [`ShutterSpeed::ALL`]
    pub fn range(&self) -> (f64, f64) {
        match self {
            ManualControl::Exposure => (-3.0, 3.0),
            ManualControl::Temperature => (1800.0, 9800.0),
            ManualControl::ShutterSpeed => (0.0, (ShutterSpeed::ALL.len() - 1) as f64),
            ManualControl::Iso => (50.0, 6400.0),
        }
    }

    /// Wheel detent size
    pub fn step(&self) -> f64 {
        match self {
            ManualControl::Exposure => 0.1,
            ManualControl::Temperature => 100.0,
            ManualControl::ShutterSpeed => 1.0,
            ManualControl::Iso => 50.0,
        }
    }

    /// Value shown when the control is first switched to manual
    pub fn default_value(&self) -> f64 {
        match self {
            ManualControl::Exposure => 0.0,
            ManualControl::Temperature => 5600.0,
            ManualControl::ShutterSpeed => 5.0,
            ManualControl::Iso => 200.0,
        }
    }

    /// Clamp and snap a wheel value to the nearest detent
    pub fn snap(&self, value: f64) -> f64 {
        let (min, max) = self.range();
        let step = self.step();
        let snapped = min + ((value - min) / step).round() * step;
        snapped.clamp(min, max)
    }

    /// Format a value for the wheel label
    pub fn format_value(&self, value: f64, is_auto: bool) -> String {
        if is_auto {
            return "Auto".to_string();
        }
        match self {
            ManualControl::Exposure => format!("{:+.1} EV", value),
            ManualControl::Temperature => format!("{}K", value.round() as i64),
            ManualControl::ShutterSpeed => ShutterSpeed::from_index(value.round() as usize)
                .map(|s| s.display_string())
                .unwrap_or_else(|| "Auto".to_string()),
            ManualControl::Iso => format!("ISO {}", value.round() as i64),
        }
    }
}

/// Spirit level tuning
pub mod level {
    use std::time::Duration;

    /// Below this tilt (degrees) the frame counts as level
    pub const LEVEL_THRESHOLD_DEG: f64 = 1.0;

    /// Indicator shows only between these tilts (degrees)
    pub const MIN_VISIBLE_DEG: f64 = 1.0;
    pub const MAX_VISIBLE_DEG: f64 = 10.0;

    /// Reported tilt is clamped to +/- this many degrees
    pub const DISPLAY_CLAMP_DEG: f64 = 45.0;

    /// Delay before the indicator hides once out of range
    pub const HIDE_DELAY: Duration = Duration::from_millis(300);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutter_nearest_snaps_in_log_space() {
        assert_eq!(
            ShutterSpeed::nearest(Duration::from_secs_f64(1.0 / 120.0)),
            ShutterSpeed::OneOver125
        );
        assert_eq!(ShutterSpeed::nearest(Duration::from_secs(5)), ShutterSpeed::One);
        assert_eq!(ShutterSpeed::nearest(Duration::ZERO), ShutterSpeed::OneOver4000);
    }

    #[test]
    fn test_manual_control_snap() {
        assert_eq!(ManualControl::Iso.snap(6500.0), 6400.0);
        assert_eq!(ManualControl::Temperature.snap(5649.0), 5600.0);
        assert!((ManualControl::Exposure.snap(0.26) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(ManualControl::Iso.format_value(200.0, true), "Auto");
        assert_eq!(ManualControl::ShutterSpeed.format_value(5.0, false), "1/125");
        assert_eq!(ManualControl::Exposure.format_value(-1.0, false), "-1.0 EV");
    }
}

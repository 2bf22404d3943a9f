// SPDX-License-Identifier: GPL-3.0-only

//! Zoom factor to camera module mapping
//!
//! The user-facing zoom factor is continuous and relative to the wide
//! module. Each physical module only looks good inside its own range, so
//! crossing a threshold swaps hardware instead of extending digital zoom.
//!
//! ```text
//!  factor:  0.5 ──── 1.0 ──────────── 4.0 ──────────►
//!  device:  ultra-wide │     wide       │  telephoto
//!  ratio:   1.0 (fixed)│  ratio = f     │  f / optical
//! ```

use super::types::{CameraDevice, CameraType};
use crate::config::ZoomConfig;

/// Device and per-device zoom ratio for a zoom factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTarget {
    pub camera_type: CameraType,
    pub ratio: f64,
}

impl ZoomTarget {
    pub fn new(camera_type: CameraType, ratio: f64) -> Self {
        Self { camera_type, ratio }
    }
}

/// Pure mapping from zoom factor to [`ZoomTarget`]
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomMapper {
    config: ZoomConfig,
    has_ultra_wide: bool,
    /// Optical factor of the telephoto module, None if absent
    telephoto_factor: Option<f64>,
}

impl ZoomMapper {
    /// Create a mapper for a fixed set of modules
    ///
    /// # Arguments
    /// * `has_ultra_wide` - An ultra-wide module exists
    /// * `telephoto_factor` - Native optical factor of the telephoto module
    pub fn new(config: ZoomConfig, has_ultra_wide: bool, telephoto_factor: Option<f64>) -> Self {
        Self {
            config,
            has_ultra_wide,
            telephoto_factor: telephoto_factor.filter(|f| *f > 0.0),
        }
    }

    /// Create a mapper for the modules present in `devices`
    pub fn for_devices(config: ZoomConfig, devices: &[CameraDevice]) -> Self {
        let has_ultra_wide = devices
            .iter()
            .any(|d| d.camera_type == CameraType::UltraWide);
        let telephoto_factor = devices
            .iter()
            .find(|d| d.camera_type == CameraType::Telephoto)
            .map(|d| d.native_optical_factor);
        Self::new(config, has_ultra_wide, telephoto_factor)
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    /// Map a zoom factor without regard to the current device
    ///
    /// Negative and NaN factors are treated as 0.
    pub fn map(&self, factor: f64) -> ZoomTarget {
        let factor = if factor.is_nan() { 0.0 } else { factor.max(0.0) };

        if factor < self.config.ultra_wide_threshold {
            return self.ultra_wide_or_wide(factor);
        }
        if factor >= self.config.telephoto_threshold {
            return self.telephoto_or_wide(factor);
        }
        ZoomTarget::new(CameraType::Wide, factor)
    }

    /// Map a zoom factor while `current` is bound
    ///
    /// Moving towards a wider module requires the factor to pass the
    /// threshold by the hysteresis band, so a factor hovering on a boundary
    /// does not swap hardware back and forth. Moving towards a longer module
    /// switches at the plain threshold.
    pub fn map_from(&self, current: CameraType, factor: f64) -> ZoomTarget {
        let target = self.map(factor);
        let band = self.config.switch_hysteresis.max(0.0);

        match (current, target.camera_type) {
            (CameraType::Telephoto, CameraType::Wide)
                if self.telephoto_factor.is_some()
                    && factor >= self.config.telephoto_threshold - band =>
            {
                self.telephoto_or_wide(factor)
            }
            (CameraType::Wide, CameraType::UltraWide)
                if factor >= self.config.ultra_wide_threshold - band =>
            {
                ZoomTarget::new(CameraType::Wide, self.config.ultra_wide_threshold)
            }
            _ => target,
        }
    }

    /// Target used while macro mode is on
    pub fn macro_target(&self) -> ZoomTarget {
        let camera_type = if self.has_ultra_wide {
            CameraType::UltraWide
        } else {
            CameraType::Wide
        };
        ZoomTarget::new(camera_type, self.config.macro_ratio)
    }

    fn ultra_wide_or_wide(&self, factor: f64) -> ZoomTarget {
        if self.has_ultra_wide {
            ZoomTarget::new(CameraType::UltraWide, 1.0)
        } else {
            // The wide module cannot zoom out past its native field of view
            ZoomTarget::new(CameraType::Wide, factor.max(1.0))
        }
    }

    fn telephoto_or_wide(&self, factor: f64) -> ZoomTarget {
        match self.telephoto_factor {
            Some(optical) => ZoomTarget::new(CameraType::Telephoto, factor / optical),
            None => ZoomTarget::new(CameraType::Wide, factor),
        }
    }
}

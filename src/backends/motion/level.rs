// SPDX-License-Identifier: GPL-3.0-only

//! Horizon level indicator

use super::orientation::{AccelerationSample, DeviceOrientation};
use crate::constants::level::{
    DISPLAY_CLAMP_DEG, HIDE_DELAY, LEVEL_THRESHOLD_DEG, MAX_VISIBLE_DEG, MIN_VISIBLE_DEG,
};
use tokio::time::Instant;

/// What the level overlay should show
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LevelReading {
    /// Tilt from level in degrees, clamped to +/-45
    pub angle: f64,
    pub visible: bool,
    /// Within one degree of level
    pub is_level: bool,
    /// Rotation for the overlay chrome
    pub ui_rotation: f64,
}

/// Tilt tracker with a debounced hide
///
/// Appears immediately when the tilt enters the visible band and hides
/// only after it has stayed outside the band for [`HIDE_DELAY`].
#[derive(Debug, Clone, Default)]
pub struct LevelIndicator {
    visible: bool,
    hide_at: Option<Instant>,
}

impl LevelIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tilt relative to the horizon for a gravity vector and orientation
    pub fn tilt_degrees(x: f64, y: f64, orientation: DeviceOrientation) -> f64 {
        let raw = x.atan2(-y).to_degrees();
        let offset = match orientation {
            DeviceOrientation::Portrait => 0.0,
            DeviceOrientation::PortraitUpsideDown => 180.0,
            DeviceOrientation::LandscapeLeft => -90.0,
            DeviceOrientation::LandscapeRight => 90.0,
        };

        let mut adjusted = raw - offset;
        if adjusted > 180.0 {
            adjusted -= 360.0;
        }
        if adjusted < -180.0 {
            adjusted += 360.0;
        }
        adjusted.clamp(-DISPLAY_CLAMP_DEG, DISPLAY_CLAMP_DEG)
    }

    pub fn update(
        &mut self,
        sample: &AccelerationSample,
        orientation: DeviceOrientation,
    ) -> LevelReading {
        let a = sample.acceleration;
        let angle = Self::tilt_degrees(a.x, a.y, orientation);
        let magnitude = angle.abs();
        let in_band = (MIN_VISIBLE_DEG..=MAX_VISIBLE_DEG).contains(&magnitude);

        if in_band {
            self.visible = true;
            self.hide_at = None;
        } else if self.visible {
            let deadline = *self.hide_at.get_or_insert(sample.timestamp + HIDE_DELAY);
            if sample.timestamp >= deadline {
                self.visible = false;
                self.hide_at = None;
            }
        }

        LevelReading {
            angle,
            visible: self.visible,
            is_level: magnitude < LEVEL_THRESHOLD_DEG,
            ui_rotation: orientation.ui_rotation_degrees(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::motion::Acceleration;
    use std::time::Duration;

    fn sample_at(degrees: f64, at: Instant) -> AccelerationSample {
        let rad = degrees.to_radians();
        AccelerationSample {
            acceleration: Acceleration::new(rad.sin(), -rad.cos(), 0.0),
            timestamp: at,
        }
    }

    #[test]
    fn test_tilt_relative_to_orientation() {
        let portrait = LevelIndicator::tilt_degrees(0.0, -1.0, DeviceOrientation::Portrait);
        assert!(portrait.abs() < 1e-9);

        // Held in landscape-right, gravity along +x
        let landscape = LevelIndicator::tilt_degrees(1.0, 0.0, DeviceOrientation::LandscapeRight);
        assert!(landscape.abs() < 1e-9);

        let upside = LevelIndicator::tilt_degrees(0.05, 1.0, DeviceOrientation::PortraitUpsideDown);
        assert!(upside.abs() < 5.0);

        let steep = LevelIndicator::tilt_degrees(1.0, -0.2, DeviceOrientation::Portrait);
        assert_eq!(steep, 45.0);
    }

    #[test]
    fn test_visibility_band_and_debounced_hide() {
        let start = Instant::now();
        let mut indicator = LevelIndicator::new();

        let level = indicator.update(&sample_at(0.2, start), DeviceOrientation::Portrait);
        assert!(!level.visible);
        assert!(level.is_level);

        let tilted = indicator.update(&sample_at(5.0, start), DeviceOrientation::Portrait);
        assert!(tilted.visible);
        assert!(!tilted.is_level);

        let t1 = start + Duration::from_millis(100);
        assert!(indicator.update(&sample_at(20.0, t1), DeviceOrientation::Portrait).visible);

        let t2 = t1 + Duration::from_millis(200);
        assert!(indicator.update(&sample_at(20.0, t2), DeviceOrientation::Portrait).visible);

        let t3 = t1 + Duration::from_millis(300);
        assert!(!indicator.update(&sample_at(20.0, t3), DeviceOrientation::Portrait).visible);
    }

    #[test]
    fn test_reentering_band_cancels_hide() {
        let start = Instant::now();
        let mut indicator = LevelIndicator::new();
        indicator.update(&sample_at(5.0, start), DeviceOrientation::Portrait);
        indicator.update(&sample_at(0.0, start + Duration::from_millis(100)), DeviceOrientation::Portrait);
        indicator.update(&sample_at(5.0, start + Duration::from_millis(200)), DeviceOrientation::Portrait);
        let later = indicator.update(
            &sample_at(0.0, start + Duration::from_millis(450)),
            DeviceOrientation::Portrait,
        );
        assert!(later.visible);
    }
}

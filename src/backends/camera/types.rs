// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use crate::backends::motion::DeviceOrientation;
use crate::constants::DEFAULT_APERTURE;
use crate::flash::FlashMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Field-of-view class of a physical camera module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraType {
    /// Ultra-wide module (0.5x baseline)
    UltraWide,
    /// Main wide module (1x)
    Wide,
    /// Telephoto module (native optical zoom > 1x)
    Telephoto,
}

impl CameraType {
    /// Order in which substitutes are tried when a type is missing
    pub const FALLBACK_ORDER: [CameraType; 3] =
        [CameraType::Wide, CameraType::UltraWide, CameraType::Telephoto];

    pub fn display_name(&self) -> &'static str {
        match self {
            CameraType::UltraWide => "Ultra Wide",
            CameraType::Wide => "Wide",
            CameraType::Telephoto => "Telephoto",
        }
    }
}

impl std::fmt::Display for CameraType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Inclusive numeric range of a hardware control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlRange {
    pub min: f64,
    pub max: f64,
}

impl ControlRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp a value into the range; NaN maps to the minimum
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Inclusive range of exposure durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min: Duration,
    pub max: Duration,
}

impl DurationRange {
    pub fn clamp(&self, value: Duration) -> Duration {
        value.clamp(self.min, self.max)
    }
}

/// Manual control support of one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Zoom ratio range relative to the module's native field of view
    pub zoom: ControlRange,
    pub iso: ControlRange,
    pub exposure_duration: DurationRange,
    /// Exposure compensation in EV
    pub exposure_bias: ControlRange,
    /// White balance temperature in Kelvin
    pub white_balance: ControlRange,
    /// Custom ISO/shutter exposure mode
    pub supports_manual_exposure: bool,
    /// Locked white balance gains
    pub supports_manual_white_balance: bool,
    /// Focus and exposure point of interest
    pub supports_point_of_interest: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            zoom: ControlRange::new(1.0, 10.0),
            iso: ControlRange::new(50.0, 3200.0),
            exposure_duration: DurationRange {
                min: Duration::from_micros(125),
                max: Duration::from_secs(1),
            },
            exposure_bias: ControlRange::new(-3.0, 3.0),
            white_balance: ControlRange::new(1800.0, 9800.0),
            supports_manual_exposure: true,
            supports_manual_white_balance: true,
            supports_point_of_interest: true,
        }
    }
}

/// A physical camera module
///
/// Immutable once enumerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Stable backend identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub camera_type: CameraType,
    /// Optical magnification relative to the wide module (3.0 for a 3x tele)
    pub native_optical_factor: f64,
    /// Lens f-number
    pub aperture: f64,
    /// Sensor output size in pixels
    pub sensor_width: u32,
    pub sensor_height: u32,
    pub capabilities: DeviceCapabilities,
}

impl CameraDevice {
    /// Build a device with default capabilities
    pub fn new(id: impl Into<String>, camera_type: CameraType, native_optical_factor: f64) -> Self {
        let id = id.into();
        Self {
            name: format!("{} Camera", camera_type.display_name()),
            id,
            camera_type,
            native_optical_factor,
            aperture: DEFAULT_APERTURE,
            sensor_width: 4032,
            sensor_height: 3024,
            capabilities: DeviceCapabilities::default(),
        }
    }
}

/// Point in normalised preview coordinates (0,0 top-left, 1,1 bottom-right)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub const CENTER: NormalizedPoint = NormalizedPoint { x: 0.5, y: 0.5 };

    /// Create a point, clamping both coordinates into 0..=1
    pub fn new(x: f64, y: f64) -> Self {
        let unit = ControlRange::new(0.0, 1.0);
        Self {
            x: unit.clamp(x),
            y: unit.clamp(y),
        }
    }
}

impl Default for NormalizedPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

/// A single-shot capture request
///
/// Built at capture time and consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub flash: FlashMode,
    /// Device bound when the request was issued
    pub device: CameraDevice,
    /// Orientation when the shutter was pressed
    pub orientation: DeviceOrientation,
}

/// Result of a hardware capture
#[derive(Debug, Clone)]
pub struct RawCapture {
    /// Encoded sensor output (JPEG)
    pub data: Vec<u8>,
    /// ISO actually used
    pub iso: f64,
    /// Exposure duration actually used
    pub exposure_duration: Duration,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Requested device is not present
    DeviceNotFound(String),
    /// Input could not be bound or configured
    ConfigurationFailed(String),
    /// Control is not supported by the bound device
    Unsupported(String),
    /// No input is bound
    NotConfigured,
    /// Hardware capture failed
    CaptureFailed(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::ConfigurationFailed(msg) => write!(f, "Configuration failed: {}", msg),
            BackendError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            BackendError::NotConfigured => write!(f, "No input bound"),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for crate::errors::CameraError {
    fn from(err: BackendError) -> Self {
        use crate::errors::CameraError;
        match err {
            BackendError::DeviceNotFound(_) => CameraError::NoCameraFound,
            BackendError::CaptureFailed(msg) => CameraError::CaptureFailed(msg),
            other => CameraError::ConfigurationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_range_clamp() {
        let range = ControlRange::new(-2.0, 2.0);
        assert_eq!(range.clamp(5.0), 2.0);
        assert_eq!(range.clamp(-5.0), -2.0);
        assert_eq!(range.clamp(f64::NAN), -2.0);
        assert!(range.contains(0.0));
    }

    #[test]
    fn test_normalized_point_clamps() {
        let p = NormalizedPoint::new(1.5, -0.2);
        assert_eq!(p, NormalizedPoint { x: 1.0, y: 0.0 });
    }

    #[test]
    fn test_backend_error_maps_to_camera_error() {
        use crate::errors::CameraError;
        let err: CameraError = BackendError::CaptureFailed("timeout".into()).into();
        assert_eq!(err, CameraError::CaptureFailed("timeout".into()));
        let err: CameraError = BackendError::NotConfigured.into();
        assert!(matches!(err, CameraError::ConfigurationFailed(_)));
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Published controller state

use crate::constants::{FilterLut, LensProfile, ShutterSpeed, WhiteBalancePreset};
use crate::flash::FlashMode;

/// Focal length of the wide module, used to label non-preset zoom factors
const WIDE_EQUIVALENT_MM: f64 = 24.0;

/// Capture workflow state machine
///
/// ```text
/// Idle → Capturing → Processing → Saved
///            │            │
///            └────────────┴──────→ Failure(message)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// Waiting for the hardware
    Capturing,
    /// Rendering and writing files
    Processing,
    /// Asset stored; the presentation layer resets to idle after a delay
    Saved,
    /// Stays until reset or the next capture
    Failure(String),
}

impl CaptureState {
    /// A capture is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, CaptureState::Capturing | CaptureState::Processing)
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            CaptureState::Failure(message) => Some(message),
            _ => None,
        }
    }
}

/// User selections that are not hardware state
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub flash: FlashMode,
    pub filter: FilterLut,
    /// Selected lens preset; None after a free zoom
    pub lens: Option<LensProfile>,
    pub zoom_factor: f64,
    pub macro_mode: bool,
    pub white_balance_preset: Option<WhiteBalancePreset>,
    /// Manual shutter selection; None in auto
    pub shutter: Option<ShutterSpeed>,
    pub store_location: bool,
}

impl ControlState {
    pub fn new(lens: LensProfile, store_location: bool) -> Self {
        Self {
            flash: FlashMode::default(),
            filter: FilterLut::default(),
            lens: Some(lens),
            zoom_factor: lens.zoom_factor(),
            macro_mode: false,
            white_balance_preset: None,
            shutter: None,
            store_location,
        }
    }

    /// Lens label recorded on captured assets
    pub fn lens_label(&self) -> String {
        if self.macro_mode {
            return "Macro".to_string();
        }
        match self.lens {
            Some(lens) => lens.label(),
            None => format!("{}mm", (WIDE_EQUIVALENT_MM * self.zoom_factor).round() as u32),
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(LensProfile::default(), true)
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Flash mode selection
//!
//! The mode travels with each capture request; the backend decides how to
//! fire the LED.

use serde::{Deserialize, Serialize};

/// Flash operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlashMode {
    /// Flash never fires
    #[default]
    Off,
    /// Flash fires for every capture
    On,
    /// Backend decides from scene brightness
    Auto,
}

impl FlashMode {
    /// Flash button tap: Off and On swap, Auto turns off
    pub fn toggle(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::On,
            FlashMode::On | FlashMode::Auto => FlashMode::Off,
        }
    }

    /// Cycle to the next mode: Off -> On -> Auto -> Off
    pub fn next(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Auto,
            FlashMode::Auto => FlashMode::Off,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FlashMode::Off => "Off",
            FlashMode::On => "On",
            FlashMode::Auto => "Auto",
        }
    }
}

impl std::fmt::Display for FlashMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for FlashMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(FlashMode::Off),
            "on" => Ok(FlashMode::On),
            "auto" => Ok(FlashMode::Auto),
            other => Err(format!("unknown flash mode '{}'", other)),
        }
    }
}

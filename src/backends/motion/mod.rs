// SPDX-License-Identifier: MPL-2.0

//! Motion sensing
//!
//! Device orientation is derived from the accelerometer alone. The
//! interface may be locked to portrait while the phone is held sideways, so
//! nothing here ever reads orientation back from the presentation layer.
//!
//! ```text
//! MotionSource ──(100ms)──► OrientationSampler ──► watch<DeviceOrientation>
//!                                  │
//!                                  └─────────────► watch<LevelReading>
//! ```

pub mod level;
pub mod orientation;

pub use level::{LevelIndicator, LevelReading};
pub use orientation::{
    Acceleration, AccelerationSample, DeviceOrientation, MotionSource, OrientationEstimator,
    OrientationSampler, ScriptedMotion, UnavailableMotion,
};

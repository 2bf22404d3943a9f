// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   CaptureSession    │  ← Serialized command worker
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐     ┌────────────┐
//! │   DeviceSelector    │ ←── │ ZoomMapper │  ← factor → (type, ratio)
//! └──────────┬──────────┘     └────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!            ▼
//!      ┌───────────┐
//!      │ Simulated │  ← Concrete implementation
//!      └───────────┘
//! ```
//!
//! Backends are driven from a single worker thread, so the trait needs
//! `Send` but not `Sync`.

pub mod manager;
pub mod simulated;
pub mod types;
pub mod zoom;

pub use manager::DeviceSelector;
pub use simulated::{SimulatedBackend, SimulatedLog};
pub use types::*;
pub use zoom::{ZoomMapper, ZoomTarget};

use std::time::Duration;

/// Camera hardware interface
///
/// Configuration changes follow a transaction model: inputs are removed and
/// added between [`begin_configuration`](Self::begin_configuration) and
/// [`commit_configuration`](Self::commit_configuration).
pub trait CameraBackend: Send {
    // ===== Enumeration =====

    /// Enumerate the physical camera modules
    fn enumerate_devices(&self) -> Vec<CameraDevice>;

    // ===== Configuration =====

    /// Open a configuration transaction
    fn begin_configuration(&mut self);

    /// Remove the currently bound input, if any
    fn remove_input(&mut self);

    /// Bind a device as the session input
    fn add_input(&mut self, device: &CameraDevice) -> BackendResult<()>;

    /// Commit the configuration transaction
    fn commit_configuration(&mut self);

    /// Number of inputs currently bound
    fn bound_inputs(&self) -> usize;

    // ===== Zoom =====

    /// Set the zoom ratio of the bound device immediately
    fn set_zoom_ratio(&mut self, ratio: f64) -> BackendResult<()>;

    /// Ramp smoothly towards a zoom ratio
    ///
    /// # Arguments
    /// * `ratio` - Target zoom ratio
    /// * `rate` - Ramp speed in factor doublings per second
    fn ramp_zoom_ratio(&mut self, ratio: f64, rate: f32) -> BackendResult<()>;

    // ===== Exposure =====

    /// Exposure compensation in EV
    fn set_exposure_bias(&mut self, ev: f64) -> BackendResult<()>;

    /// Custom exposure with fixed duration and ISO
    fn set_exposure_custom(&mut self, duration: Duration, iso: f64) -> BackendResult<()>;

    /// Continuous auto exposure
    fn set_exposure_auto(&mut self) -> BackendResult<()>;

    // ===== White balance =====

    /// Lock white balance gains to a colour temperature
    fn set_white_balance_locked(&mut self, kelvin: f64) -> BackendResult<()>;

    /// Continuous auto white balance
    fn set_white_balance_auto(&mut self) -> BackendResult<()>;

    // ===== Focus =====

    /// Focus and meter at a point, then continue auto-focusing there
    fn set_point_of_interest(&mut self, point: NormalizedPoint) -> BackendResult<()>;

    /// Return to continuous auto focus and exposure over the whole frame
    fn set_focus_auto(&mut self) -> BackendResult<()>;

    /// Freeze focus and exposure at their current values
    fn lock_focus_exposure(&mut self) -> BackendResult<()>;

    // ===== Capture =====

    /// Capture a single still
    ///
    /// Blocks until the hardware delivers the photo or fails.
    fn capture(&mut self, request: &CaptureRequest) -> BackendResult<RawCapture>;
}

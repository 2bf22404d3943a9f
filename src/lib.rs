// SPDX-License-Identifier: MPL-2.0

//! Mobile Camera - capture orchestration core for a multi-lens phone camera
//!
//! This library sequences everything between a shutter press and a stored
//! photo: device selection and zoom mapping across lens modules, manual
//! exposure controls, tap-to-focus with an auto-reverting lock, orientation
//! sampling, rendering three JPEG tiers and persisting them as one asset.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Presentation-facing controller and capture workflow
//! - [`backends`]: Camera hardware and motion sensor abstraction
//! - [`session`]: Serialized capture session and focus/exposure state
//! - [`pipelines`]: Post-capture photo rendering
//! - [`config`]: User configuration handling
//! - [`storage`]: Asset files and the catalog seam
//!
//! # Example
//!
//! ```ignore
//! let controller = CameraController::start(
//!     Config::default(),
//!     Box::new(SimulatedBackend::new()),
//!     Box::new(ScriptedMotion::upright()),
//!     Arc::new(MemoryCatalog::new()),
//! )
//! .await;
//! controller.zoom(2.0).await?;
//! let asset = controller.capture(None).await?;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod pipelines;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use app::{CameraController, CaptureState, ControlState};
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError};
pub use flash::FlashMode;
pub use storage::{MemoryCatalog, PhotoAsset, PhotoCatalog};

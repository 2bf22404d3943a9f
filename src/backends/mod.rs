// SPDX-License-Identifier: MPL-2.0

//! Hardware abstraction layer
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Session / App Layer            │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │  ┌─────────────────┐   ┌─────────────────┐  │
//! │  │     Camera      │   │     Motion      │  │
//! │  │ (device, zoom)  │   │ (accelerometer) │  │
//! │  └─────────────────┘   └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Camera modules, device selection and zoom mapping
//! - [`motion`]: Orientation and level from the accelerometer

pub mod camera;
pub mod motion;

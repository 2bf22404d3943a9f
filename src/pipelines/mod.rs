// SPDX-License-Identifier: MPL-2.0

//! Post-capture processing pipelines
//!
//! Heavy work runs on the blocking thread pool so the capture session's
//! command worker is never held up by image processing.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Raw Capture  │ ──▶ │  Photo Pipeline   │ ──▶ │  3× JPEG     │
//! │   (JPEG)     │     │  - Orientation    │     │  + asset     │
//! │              │     │  - Tier encoding  │     │    record    │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```

pub mod photo;

// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  App Layer                   │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────────────────────────┐   │
//! │  │ camera: CameraBackend trait, session │   │
//! │  └──────────────────────────────────────┘   │
//! │  ┌──────────────────────────────────────┐   │
//! │  │ virtual_camera: software devices     │   │
//! │  └──────────────────────────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Backend trait, device selection and the capture session
//! - [`virtual_camera`]: Software camera with test-pattern and image sources

pub mod camera;
pub mod virtual_camera;

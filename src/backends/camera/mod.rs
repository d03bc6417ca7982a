// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌──────────────────────────┐
//! │   App (interactive task) │
//! └────────────┬─────────────┘
//!              │ SessionEvent
//!              ▼
//! ┌──────────────────────────┐
//! │ CaptureSessionController │  ← state machine, owns the device
//! └────────────┬─────────────┘
//!              │ DeviceEvent channel
//!              ▼
//! ┌──────────────────────────┐
//! │   CameraBackend trait    │  ← enumeration, authorization, open
//! └────────────┬─────────────┘
//!              ▼
//!       ┌──────────────┐
//!       │ VirtualCamera│  ← software implementation
//!       └──────────────┘
//! ```
//!
//! Hardware callbacks never touch session state directly. A device pushes
//! frames and still results into a [`DeviceEventSender`]; the session's pump
//! task is the only consumer.

pub mod frame_loop;
pub mod session;
pub mod types;

pub use session::{CaptureSessionController, SessionEvent};
pub use types::*;

use tracing::debug;

/// Camera backend trait
///
/// A backend knows which devices exist, whether the process may use them,
/// and how to open one. Everything after `open` happens through the returned
/// [`DeviceHandle`] and the event channel passed in.
pub trait CameraBackend: Send + Sync {
    /// Human readable backend name for logs
    fn name(&self) -> &str;

    /// Current hardware access authorization
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the platform for access. Only meaningful when the status is
    /// `NotDetermined`; returns the resolved status.
    fn request_authorization(&self) -> AuthorizationStatus;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Open a device and start streaming preview frames into `events`
    ///
    /// This may block while the hardware spins up; callers run it off the
    /// interactive context.
    fn open(
        &self,
        device: &CameraDevice,
        still_resolution: Resolution,
        events: DeviceEventSender,
    ) -> BackendResult<Box<dyn DeviceHandle>>;
}

/// An open, streaming camera device
pub trait DeviceHandle: Send {
    /// Issue one still-photo request. The result arrives later on the
    /// still queue of the device event channel.
    fn request_still(&mut self) -> BackendResult<()>;

    /// Stop streaming and release the hardware. Must be idempotent.
    fn stop(&mut self);

    /// The device this handle was opened for
    fn device(&self) -> &CameraDevice;
}

/// Fixed device selection policy: a camera facing `position`, configured at
/// its highest still-photo preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePolicy {
    pub position: DevicePosition,
}

impl Default for DevicePolicy {
    fn default() -> Self {
        Self {
            position: DevicePosition::Back,
        }
    }
}

impl DevicePolicy {
    /// Pick the matching device with the largest still preset
    pub fn select(&self, devices: &[CameraDevice]) -> Option<(CameraDevice, Resolution)> {
        let selected = devices
            .iter()
            .filter(|d| d.position == self.position)
            .filter_map(|d| d.max_still_resolution().map(|r| (d, r)))
            .max_by_key(|(_, r)| r.pixels())
            .map(|(d, r)| (d.clone(), r));

        if let Some((device, resolution)) = &selected {
            debug!(device = %device.name, %resolution, "Device selected by policy");
        }
        selected
    }
}

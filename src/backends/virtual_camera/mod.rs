// SPDX-License-Identifier: GPL-3.0-only

//! Software camera backend
//!
//! [`VirtualCamera`] behaves like a phone camera stack without hardware:
//! it reports an authorization status, enumerates a back and a front
//! camera with landscape-mounted sensors, streams preview frames from a
//! [`FrameSource`] on a paced thread, and answers still requests after a
//! configurable latency with a JPEG at the selected still preset.
//!
//! Faults can be queued per still request ([`StillFault`]) to exercise the
//! failure paths of the capture session.
//!
//! ```text
//! FrameSource ──► FrameLoop thread ──► DeviceEventSender::send_frame
//!             └─► still thread (latency) ──► DeviceEventSender::send_still
//! ```

mod file_source;

pub use file_source::FrameSource;

use crate::backends::camera::frame_loop::{FrameLoop, LoopAction};
use crate::backends::camera::types::{
    AuthorizationStatus, BackendError, BackendResult, CameraDevice, DeviceEventSender,
    DevicePosition, FrameData, Resolution, SensorRotation, StillCapture,
};
use crate::backends::camera::{CameraBackend, DeviceHandle};
use crate::constants::virtual_camera as vc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A fault applied to the next still request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StillFault {
    /// Deliver bytes that do not decode
    Malformed,
    /// Deliver a device error instead of a photo
    DeviceError(BackendError),
    /// Deliver normally after this latency instead of the configured one
    Latency(Duration),
}

/// Virtual camera settings
#[derive(Debug, Clone)]
pub struct VirtualCameraConfig {
    pub authorization: AuthorizationStatus,
    /// Status reported after a `NotDetermined` prompt
    pub grant_on_request: bool,
    pub devices: Vec<CameraDevice>,
    pub source: FrameSource,
    pub frame_interval: Duration,
    pub still_latency: Duration,
}

impl Default for VirtualCameraConfig {
    fn default() -> Self {
        Self {
            authorization: AuthorizationStatus::Authorized,
            grant_on_request: true,
            devices: default_devices(),
            source: FrameSource::default(),
            frame_interval: vc::FRAME_INTERVAL,
            still_latency: vc::STILL_LATENCY,
        }
    }
}

/// The built-in device list: a back camera and a front camera
pub fn default_devices() -> Vec<CameraDevice> {
    vec![
        CameraDevice {
            id: "virtual-back".into(),
            name: "Virtual Back Camera".into(),
            position: DevicePosition::Back,
            rotation: SensorRotation::Rotate90,
            still_resolutions: vec![
                Resolution::new(1920, 1440),
                Resolution::new(3264, 2448),
                vc::MAX_STILL_RESOLUTION,
            ],
            preview_resolution: vc::PREVIEW_RESOLUTION,
        },
        CameraDevice {
            id: "virtual-front".into(),
            name: "Virtual Front Camera".into(),
            position: DevicePosition::Front,
            rotation: SensorRotation::Rotate270,
            still_resolutions: vec![Resolution::new(1920, 1440)],
            preview_resolution: vc::PREVIEW_RESOLUTION,
        },
    ]
}

/// Software camera backend
pub struct VirtualCamera {
    config: VirtualCameraConfig,
    authorization: Mutex<AuthorizationStatus>,
    faults: Arc<Mutex<VecDeque<StillFault>>>,
}

impl VirtualCamera {
    pub fn new(config: VirtualCameraConfig) -> Self {
        let authorization = Mutex::new(config.authorization);
        Self {
            config,
            authorization,
            faults: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Queue a fault for a future still request (first in, first applied)
    pub fn inject_still_fault(&self, fault: StillFault) {
        debug!(?fault, "Queued still fault");
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(fault);
    }
}

impl Default for VirtualCamera {
    fn default() -> Self {
        Self::new(VirtualCameraConfig::default())
    }
}

impl CameraBackend for VirtualCamera {
    fn name(&self) -> &str {
        "virtual"
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        *self
            .authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn request_authorization(&self) -> AuthorizationStatus {
        let mut status = self
            .authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *status == AuthorizationStatus::NotDetermined {
            *status = if self.config.grant_on_request {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
            info!(status = ?*status, "Camera authorization resolved");
        }
        *status
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.config.devices.clone()
    }

    fn open(
        &self,
        device: &CameraDevice,
        still_resolution: Resolution,
        events: DeviceEventSender,
    ) -> BackendResult<Box<dyn DeviceHandle>> {
        if self.authorization_status() != AuthorizationStatus::Authorized {
            return Err(BackendError::PermissionDenied);
        }
        if !self.config.devices.iter().any(|d| d.id == device.id) {
            return Err(BackendError::DeviceNotFound(device.id.clone()));
        }

        let source = self.config.source.clone();
        let preview = device.preview_resolution;
        let rotation = device.rotation;
        let frame_events = events.clone();
        let mut tick = 0u64;

        let frame_loop = FrameLoop::start(
            &format!("{}-frames", device.id),
            self.config.frame_interval,
            move || {
                let frame = source.raw_frame(preview, rotation, tick);
                tick = tick.wrapping_add(1);
                if frame_events.send_frame(frame) {
                    LoopAction::Continue
                } else {
                    LoopAction::Stop
                }
            },
        )?;

        info!(device = %device.name, still = %still_resolution, "Virtual camera streaming");

        Ok(Box::new(VirtualDevice {
            device: device.clone(),
            still_resolution,
            source: self.config.source.clone(),
            still_latency: self.config.still_latency,
            faults: Arc::clone(&self.faults),
            events: Some(events),
            frame_loop: Some(frame_loop),
            stopped: Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// An open virtual device
struct VirtualDevice {
    device: CameraDevice,
    still_resolution: Resolution,
    source: FrameSource,
    still_latency: Duration,
    faults: Arc<Mutex<VecDeque<StillFault>>>,
    events: Option<DeviceEventSender>,
    frame_loop: Option<FrameLoop>,
    stopped: Arc<AtomicBool>,
}

impl DeviceHandle for VirtualDevice {
    fn request_still(&mut self) -> BackendResult<()> {
        let Some(events) = self.events.clone() else {
            return Err(BackendError::Disconnected);
        };

        let fault = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let latency = match &fault {
            Some(StillFault::Latency(latency)) => *latency,
            _ => self.still_latency,
        };

        let source = self.source.clone();
        let size = self.still_resolution;
        let rotation = self.device.rotation;
        let stopped = Arc::clone(&self.stopped);

        thread::Builder::new()
            .name(format!("{}-still", self.device.id))
            .spawn(move || {
                thread::sleep(latency);
                if stopped.load(Ordering::SeqCst) {
                    debug!("Device stopped before still was delivered");
                    return;
                }
                let delivery = match fault {
                    Some(StillFault::DeviceError(e)) => Err(e),
                    Some(StillFault::Malformed) => Ok(StillCapture {
                        encoded: FrameData::from(vec![0xFF, 0xD8, 0xFF, 0x00, 0xBA, 0xD0]),
                        rotation,
                        captured_at: Instant::now(),
                    }),
                    _ => encode_still(&source, size, rotation),
                };
                if !events.send_still(delivery) {
                    debug!("Session gone, still dropped");
                }
            })?;

        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
        }
        self.events = None;
        info!(device = %self.device.name, "Virtual camera stopped");
    }

    fn device(&self) -> &CameraDevice {
        &self.device
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Render and JPEG-encode one still at the sensor's native orientation
fn encode_still(
    source: &FrameSource,
    size: Resolution,
    rotation: SensorRotation,
) -> BackendResult<StillCapture> {
    let sensor = source.render_sensor(size, rotation, 0);
    let rgb = image::DynamicImage::ImageRgba8(sensor).to_rgb8();

    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgb8(rgb)
        .write_to(
            &mut std::io::Cursor::new(&mut encoded),
            image::ImageFormat::Jpeg,
        )
        .map_err(|e| {
            warn!(error = %e, "Still encoding failed");
            BackendError::Other(e.to_string())
        })?;

    Ok(StillCapture {
        encoded: FrameData::from(encoded),
        rotation,
        captured_at: Instant::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::device_channel;

    fn small_config() -> VirtualCameraConfig {
        let mut config = VirtualCameraConfig {
            frame_interval: Duration::from_millis(5),
            still_latency: Duration::from_millis(5),
            ..Default::default()
        };
        for device in &mut config.devices {
            device.still_resolutions = vec![Resolution::new(32, 24)];
            device.preview_resolution = Resolution::new(16, 12);
        }
        config
    }

    #[test]
    fn test_request_authorization_resolves_once() {
        let camera = VirtualCamera::new(VirtualCameraConfig {
            authorization: AuthorizationStatus::NotDetermined,
            grant_on_request: false,
            ..Default::default()
        });
        assert_eq!(camera.request_authorization(), AuthorizationStatus::Denied);
        assert_eq!(camera.authorization_status(), AuthorizationStatus::Denied);
    }

    #[test]
    fn test_open_denied_without_authorization() {
        let camera = VirtualCamera::new(VirtualCameraConfig {
            authorization: AuthorizationStatus::Denied,
            ..small_config()
        });
        let device = camera.enumerate_cameras().remove(0);
        let (tx, _rx) = device_channel();
        let err = camera
            .open(&device, Resolution::new(32, 24), tx)
            .err()
            .unwrap();
        assert_eq!(err, BackendError::PermissionDenied);
    }

    #[tokio::test]
    async fn test_streams_frames_and_delivers_still() {
        let camera = VirtualCamera::new(small_config());
        let device = camera.enumerate_cameras().remove(0);
        let (tx, mut rx) = device_channel();
        let mut handle = camera.open(&device, Resolution::new(32, 24), tx).unwrap();

        rx.frames.changed().await.unwrap();
        let frame = rx.frames.borrow_and_update().clone().unwrap();
        assert_eq!((frame.width, frame.height), (16, 12));
        assert_eq!(frame.rotation, SensorRotation::Rotate90);

        handle.request_still().unwrap();
        let still = rx.stills.recv().await.unwrap().unwrap();
        let decoded = image::load_from_memory(&still.encoded).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));

        handle.stop();
        handle.stop();
        assert_eq!(handle.request_still(), Err(BackendError::Disconnected));
    }

    #[tokio::test]
    async fn test_faults_apply_in_order() {
        let camera = VirtualCamera::new(small_config());
        camera.inject_still_fault(StillFault::DeviceError(BackendError::Busy));
        camera.inject_still_fault(StillFault::Malformed);

        let device = camera.enumerate_cameras().remove(0);
        let (tx, mut rx) = device_channel();
        let mut handle = camera.open(&device, Resolution::new(32, 24), tx).unwrap();

        handle.request_still().unwrap();
        assert_eq!(rx.stills.recv().await.unwrap().unwrap_err(), BackendError::Busy);

        handle.request_still().unwrap();
        let malformed = rx.stills.recv().await.unwrap().unwrap();
        assert!(image::load_from_memory(&malformed.encoded).is_err());

        handle.request_still().unwrap();
        assert!(rx.stills.recv().await.unwrap().is_ok());
    }
}

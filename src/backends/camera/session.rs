// SPDX-License-Identifier: GPL-3.0-only

//! Capture session state machine
//!
//! [`CaptureSessionController`] owns the open device and turns it into:
//!
//! - a lossy preview slot holding the newest decoded frame
//! - an event queue carrying exactly one outcome per still request
//! - an observable [`SessionState`]
//!
//! Device output is consumed by a single pump task. Frame decoding and photo
//! decoding run on the blocking pool, never on the task that drives the UI.
//! State transitions go through `watch::Sender::send_if_modified`, so the
//! check and the update happen under one lock.

use super::types::{
    BackendError, DeviceEventReceiver, SessionState, StillDelivery, device_channel,
};
use super::{AuthorizationStatus, CameraBackend, CameraDevice, DeviceHandle, DevicePolicy};
use crate::errors::{CaptureError, SessionError, SessionResult};
use crate::media::{BaseImage, Bitmap, ImageCodec};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Events the session reports to its consumer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A still capture was decoded into a new photo
    CaptureCompleted(BaseImage),
    /// A still capture produced no photo; the session is `Running` again
    CaptureFailed(CaptureError),
    /// The device stopped delivering; the session is `Failed`
    DeviceLost,
}

type SharedDevice = Arc<Mutex<Option<Box<dyn DeviceHandle>>>>;

/// Owns one camera device from configuration to teardown
pub struct CaptureSessionController {
    backend: Arc<dyn CameraBackend>,
    policy: DevicePolicy,
    codec: ImageCodec,
    state: Arc<watch::Sender<SessionState>>,
    preview: Arc<watch::Sender<Option<Bitmap>>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    device: SharedDevice,
    /// Cleared at teardown; in-flight work checks it before touching state
    alive: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl CaptureSessionController {
    /// Create an idle session and the receiver for its events
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        policy: DevicePolicy,
        codec: ImageCodec,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let controller = Self {
            backend,
            policy,
            codec,
            state: Arc::new(watch::Sender::new(SessionState::Idle)),
            preview: Arc::new(watch::Sender::new(None)),
            events,
            device: Arc::new(Mutex::new(None)),
            alive: Arc::new(AtomicBool::new(false)),
            pump: None,
        };
        (controller, events_rx)
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observe state changes (e.g. to disable the capture control while
    /// `Capturing`)
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Observe the newest decoded preview frame
    pub fn subscribe_preview(&self) -> watch::Receiver<Option<Bitmap>> {
        self.preview.subscribe()
    }

    /// The device currently owned by the session
    pub fn device(&self) -> Option<CameraDevice> {
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| d.device().clone())
    }

    /// Acquire a device matching the policy and start streaming
    ///
    /// Valid only from `Idle`. On success the session is `Running`; on
    /// `PermissionDenied` or `DeviceUnavailable` it is `Failed` for good.
    pub async fn configure(&mut self) -> SessionResult<()> {
        let current = self.state();
        if current != SessionState::Idle {
            return Err(SessionError::InvalidState {
                operation: "configure",
                state: current,
            });
        }

        info!(backend = self.backend.name(), "Configuring capture session");
        self.set_state(SessionState::Configuring);

        match self.acquire_device().await {
            Ok(()) => {
                self.set_state(SessionState::Running);
                info!("Capture session running");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Capture session configuration failed");
                self.set_state(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn acquire_device(&mut self) -> SessionResult<()> {
        let backend = Arc::clone(&self.backend);
        let status = tokio::task::spawn_blocking(move || match backend.authorization_status() {
            AuthorizationStatus::NotDetermined => backend.request_authorization(),
            status => status,
        })
        .await
        .map_err(|e| SessionError::Backend(BackendError::Other(e.to_string())))?;

        if status != AuthorizationStatus::Authorized {
            return Err(SessionError::PermissionDenied);
        }

        let devices = self.backend.enumerate_cameras();
        debug!(count = devices.len(), "Enumerated cameras");
        let Some((device, still_resolution)) = self.policy.select(&devices) else {
            return Err(SessionError::DeviceUnavailable(format!(
                "no {}-facing camera with a still preset",
                self.policy.position
            )));
        };

        info!(
            device = %device.name,
            still = %still_resolution,
            preview = %device.preview_resolution,
            "Opening camera"
        );

        let (sender, receiver) = device_channel();
        let backend = Arc::clone(&self.backend);
        let handle = tokio::task::spawn_blocking(move || {
            backend.open(&device, still_resolution, sender)
        })
        .await
        .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?
        .map_err(|e| match e {
            BackendError::PermissionDenied => SessionError::PermissionDenied,
            other => SessionError::DeviceUnavailable(other.to_string()),
        })?;

        *self.device.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        self.alive.store(true, Ordering::SeqCst);

        let pump = SessionPump {
            codec: self.codec,
            state: Arc::clone(&self.state),
            preview: Arc::clone(&self.preview),
            events: self.events.clone(),
            alive: Arc::clone(&self.alive),
        };
        self.pump = Some(tokio::spawn(pump.run(receiver)));
        Ok(())
    }

    /// Issue one still-photo request
    ///
    /// Valid only in `Running`. While a capture is pending further requests
    /// fail with `CaptureAlreadyInFlight`; they are not queued. The photo
    /// itself arrives later as [`SessionEvent::CaptureCompleted`] or
    /// [`SessionEvent::CaptureFailed`].
    pub fn request_capture(&self) -> SessionResult<()> {
        let mut rejection = None;
        self.state.send_if_modified(|state| match *state {
            SessionState::Running => {
                *state = SessionState::Capturing;
                true
            }
            SessionState::Capturing => {
                rejection = Some(SessionError::CaptureAlreadyInFlight);
                false
            }
            other => {
                rejection = Some(SessionError::InvalidState {
                    operation: "capture",
                    state: other,
                });
                false
            }
        });
        if let Some(err) = rejection {
            debug!(error = %err, "Capture request rejected");
            return Err(err);
        }

        let issued = match self
            .device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            Some(device) => device.request_still(),
            None => Err(BackendError::Disconnected),
        };

        if let Err(e) = issued {
            warn!(error = %e, "Still request failed");
            self.state.send_if_modified(|state| {
                if *state == SessionState::Capturing {
                    *state = SessionState::Running;
                    true
                } else {
                    false
                }
            });
            return Err(e.into());
        }

        info!("Still capture requested");
        Ok(())
    }

    /// Stop the device and release session resources
    ///
    /// Safe from any state and idempotent. A capture still in flight is
    /// dropped when it lands; it never touches the released device.
    pub fn teardown(&mut self) {
        let previous = self.state.send_replace(SessionState::Stopped);
        self.alive.store(false, Ordering::SeqCst);

        let device = self
            .device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut device) = device {
            device.stop();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.preview.send_replace(None);

        if previous != SessionState::Stopped {
            info!(from = %previous, "Capture session torn down");
        }
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        debug!(from = %previous, to = %next, "Session state changed");
    }
}

impl Drop for CaptureSessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// The single consumer of device output
struct SessionPump {
    codec: ImageCodec,
    state: Arc<watch::Sender<SessionState>>,
    preview: Arc<watch::Sender<Option<Bitmap>>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    alive: Arc<AtomicBool>,
}

impl SessionPump {
    async fn run(self, mut receiver: DeviceEventReceiver) {
        debug!("Session pump started");
        loop {
            tokio::select! {
                biased;

                still = receiver.stills.recv() => match still {
                    Some(still) => self.handle_still(still).await,
                    None => break,
                },
                changed = receiver.frames.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let frame = receiver.frames.borrow_and_update().clone();
                    if let Some(frame) = frame {
                        self.handle_frame(frame).await;
                    }
                }
            }
        }

        if self.alive.load(Ordering::SeqCst) {
            warn!("Camera stopped delivering, session failed");
            self.state.send_replace(SessionState::Failed);
            let _ = self.events.send(SessionEvent::DeviceLost);
        }
        debug!("Session pump exiting");
    }

    async fn handle_frame(&self, frame: super::types::RawFrame) {
        let codec = self.codec;
        let decoded = tokio::task::spawn_blocking(move || codec.decode_preview_frame(&frame)).await;
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        match decoded {
            Ok(Ok(bitmap)) => {
                self.preview.send_replace(Some(bitmap));
            }
            Ok(Err(e)) => debug!(error = %e, "Dropping undecodable preview frame"),
            Err(e) => warn!(error = %e, "Preview decode task failed"),
        }
    }

    async fn handle_still(&self, delivery: StillDelivery) {
        let outcome = match delivery {
            Ok(still) => {
                let codec = self.codec;
                match tokio::task::spawn_blocking(move || codec.decode_still_capture(&still)).await
                {
                    Ok(decoded) => decoded.map_err(CaptureError::from),
                    Err(e) => Err(CaptureError::Worker(e.to_string())),
                }
            }
            Err(e) => Err(CaptureError::Device(e)),
        };

        if !self.alive.load(Ordering::SeqCst) {
            debug!("Discarding capture delivered after teardown");
            return;
        }

        // Back to Running before anyone hears about the photo, so a consumer
        // reacting to the event can capture again straight away.
        self.state.send_if_modified(|state| {
            if *state == SessionState::Capturing {
                *state = SessionState::Running;
                true
            } else {
                false
            }
        });

        let event = match outcome {
            Ok(base) => {
                info!(
                    id = %base.id(),
                    width = base.bitmap().width(),
                    height = base.bitmap().height(),
                    "Capture completed"
                );
                SessionEvent::CaptureCompleted(base)
            }
            Err(e) => {
                warn!(error = %e, "Capture produced no photo");
                SessionEvent::CaptureFailed(e)
            }
        };
        let _ = self.events.send(event);
    }
}

// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Immutable frame bytes shared between the device thread and the decoder
#[derive(Clone)]
pub struct FrameData(Arc<[u8]>);

impl FrameData {
    /// Get the length of the frame data in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(bytes: Vec<u8>) -> Self {
        FrameData(Arc::from(bytes))
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameData({} bytes)", self.0.len())
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Which side of the device the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevicePosition {
    Front,
    Back,
    External,
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePosition::Front => write!(f, "front"),
            DevicePosition::Back => write!(f, "back"),
            DevicePosition::External => write!(f, "external"),
        }
    }
}

/// Sensor rotation in degrees (clockwise)
///
/// Phone-style sensors are mounted in landscape, so frames arrive rotated
/// relative to a portrait display. The codec rotates by this amount to get
/// an upright image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorRotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    /// Backend-specific identifier
    pub id: String,
    pub name: String,
    pub position: DevicePosition,
    pub rotation: SensorRotation,
    /// Still-photo presets the device supports
    pub still_resolutions: Vec<Resolution>,
    /// Resolution of the continuous preview stream
    pub preview_resolution: Resolution,
}

impl CameraDevice {
    /// Highest still-photo preset, by pixel count
    pub fn max_still_resolution(&self) -> Option<Resolution> {
        self.still_resolutions.iter().copied().max_by_key(|r| r.pixels())
    }
}

/// Pixel layout of a preview frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    NV12,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
}

impl PixelFormat {
    /// Minimum buffer size for a frame of this format with the given row stride
    pub fn min_buffer_size(&self, height: u32, stride: u32) -> usize {
        let stride = stride as usize;
        let height = height as usize;
        match self {
            Self::RGBA | Self::RGB24 | Self::Gray8 | Self::YUYV => stride * height,
            // Y plane plus half-height interleaved UV plane
            Self::NV12 => stride * height + stride * height.div_ceil(2),
        }
    }

    /// Bytes per row for a tightly packed frame
    pub fn packed_stride(&self, width: u32) -> u32 {
        match self {
            Self::RGBA => width * 4,
            Self::RGB24 => width * 3,
            // Pairs share chroma, so an odd width still needs the whole last pair
            Self::YUYV => width.div_ceil(2) * 4,
            Self::Gray8 | Self::NV12 => width,
        }
    }
}

/// One preview frame, tagged with its layout and sensor orientation
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub data: FrameData,
    pub format: PixelFormat,
    /// Row stride of the first plane in bytes
    pub stride: u32,
    pub rotation: SensorRotation,
    pub captured_at: Instant,
}

/// One captured photo as delivered by the hardware: encoded bytes plus the
/// orientation it was taken in
#[derive(Debug, Clone)]
pub struct StillCapture {
    pub encoded: FrameData,
    pub rotation: SensorRotation,
    pub captured_at: Instant,
}

/// Result of a still request as delivered by the device
pub type StillDelivery = BackendResult<StillCapture>;

/// Hardware access authorization as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    /// The user has not been asked yet; the backend may prompt
    NotDetermined,
}

/// Capture session state machine
///
/// ```text
/// Idle → Configuring → Running ⇄ Capturing
///                         ↓
///                      Stopped        (Failed from any state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Configuring,
    Running,
    Capturing,
    Stopped,
    Failed,
}

impl SessionState {
    /// Whether the device is streaming preview frames
    pub fn is_streaming(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Capturing)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::Configuring => "Configuring",
            SessionState::Running => "Running",
            SessionState::Capturing => "Capturing",
            SessionState::Stopped => "Stopped",
            SessionState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Device-side half of the event channel handed to an open device
///
/// Preview frames go through a `watch` slot: only the newest frame is kept,
/// so a frame the consumer has not picked up yet is simply overwritten.
/// Still deliveries go through an unbounded queue because each one must be
/// seen exactly once.
#[derive(Clone)]
pub struct DeviceEventSender {
    frames: watch::Sender<Option<RawFrame>>,
    stills: mpsc::UnboundedSender<StillDelivery>,
}

impl DeviceEventSender {
    /// Publish a preview frame, replacing any frame not yet consumed
    pub fn send_frame(&self, frame: RawFrame) -> bool {
        if self.frames.is_closed() {
            return false;
        }
        self.frames.send_replace(Some(frame));
        true
    }

    /// Deliver the result of a still request
    pub fn send_still(&self, still: StillDelivery) -> bool {
        self.stills.send(still).is_ok()
    }

    /// True once the session side has been dropped
    pub fn is_closed(&self) -> bool {
        self.frames.is_closed() && self.stills.is_closed()
    }
}

/// Session-side half of the device event channel
pub struct DeviceEventReceiver {
    pub frames: watch::Receiver<Option<RawFrame>>,
    pub stills: mpsc::UnboundedReceiver<StillDelivery>,
}

/// Create a connected device event channel
pub fn device_channel() -> (DeviceEventSender, DeviceEventReceiver) {
    let (frame_tx, frame_rx) = watch::channel(None);
    let (still_tx, still_rx) = mpsc::unbounded_channel();
    (
        DeviceEventSender {
            frames: frame_tx,
            stills: still_tx,
        },
        DeviceEventReceiver {
            frames: frame_rx,
            stills: still_rx,
        },
    )
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend not available: {0}")]
    NotAvailable(String),
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("Camera access denied")]
    PermissionDenied,
    #[error("Camera is busy")]
    Busy,
    #[error("Camera disconnected")]
    Disconnected,
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Error: {0}")]
    Other(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

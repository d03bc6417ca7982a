// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture-and-filter pipeline
//!
//! Errors fall into two classes:
//!
//! - **Session-fatal**: [`SessionError::DeviceUnavailable`] and
//!   [`SessionError::PermissionDenied`] leave the session in `Failed` and are
//!   reported to the caller of `configure()`.
//! - **Per-operation**: [`DecodeError`] and [`TransformError`] only decide
//!   whether a new image gets published. They are logged and swallowed at the
//!   component boundary; whatever was on screen stays on screen.

use crate::backends::camera::types::{BackendError, SessionState};
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for capture session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Filter error: {0}")]
    Transform(#[from] TransformError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capture session errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No device matches the capture policy
    #[error("No suitable camera available: {0}")]
    DeviceUnavailable(String),

    /// Hardware access was not authorized
    #[error("Camera access was not authorized")]
    PermissionDenied,

    /// A still capture is already pending; requests are rejected, not queued
    #[error("A capture is already in flight")]
    CaptureAlreadyInFlight,

    /// The operation is not valid in the current session state
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Backend failure while talking to an open device
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SessionError {
    /// Whether this error leaves the session in `Failed`
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceUnavailable(_) | Self::PermissionDenied)
    }
}

/// Why a still capture produced no photo (non-fatal; the session returns
/// to `Running`)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Device failed to deliver photo: {0}")]
    Device(#[from] BackendError),

    #[error("Decode worker failed: {0}")]
    Worker(String),
}

/// Image decoding errors (non-fatal, per frame or per capture)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed image data: {0}")]
    Malformed(String),

    #[error("Frame data too small: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Frame has zero width or height")]
    EmptyFrame,
}

/// Filter application errors (non-fatal, per render attempt)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("Invalid colour cube: {0}")]
    InvalidCube(String),

    #[error("Cannot filter an empty image")]
    EmptyImage,

    #[error("Filter worker failed: {0}")]
    Worker(String),
}

/// Export handoff errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No photo available to export")]
    NothingToExport,

    #[error("Encoding failed: {0}")]
    Encoding(#[from] image::ImageError),

    #[error("Failed to write photo: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export task failed: {0}")]
    Task(String),
}

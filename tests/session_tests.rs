// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture session over the virtual camera

use speedlens::backends::camera::{
    AuthorizationStatus, BackendError, CaptureSessionController, DevicePolicy, DevicePosition,
    Resolution, SessionEvent, SessionState,
};
use speedlens::backends::virtual_camera::{StillFault, VirtualCamera, VirtualCameraConfig};
use speedlens::errors::{CaptureError, DecodeError, SessionError};
use speedlens::media::ImageCodec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn camera_config(still_latency: Duration) -> VirtualCameraConfig {
    let mut config = VirtualCameraConfig {
        frame_interval: Duration::from_millis(5),
        still_latency,
        ..VirtualCameraConfig::default()
    };
    for device in &mut config.devices {
        device.still_resolutions = vec![Resolution::new(48, 32), Resolution::new(64, 48)];
        device.preview_resolution = Resolution::new(32, 24);
    }
    config
}

fn session(
    camera: Arc<VirtualCamera>,
) -> (CaptureSessionController, mpsc::UnboundedReceiver<SessionEvent>) {
    CaptureSessionController::new(camera, DevicePolicy::default(), ImageCodec::new(1))
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("session event channel closed")
}

#[tokio::test]
async fn test_configure_streams_upright_preview() {
    let camera = Arc::new(VirtualCamera::new(camera_config(Duration::from_millis(5))));
    let (mut session, _events) = session(camera);
    assert_eq!(session.state(), SessionState::Idle);

    session.configure().await.unwrap();
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.device().unwrap().position, DevicePosition::Back);

    let mut preview = session.subscribe_preview();
    let frame = timeout(WAIT, preview.wait_for(Option::is_some))
        .await
        .unwrap()
        .unwrap()
        .clone()
        .unwrap();
    // The back sensor is mounted a quarter turn off, so the landscape
    // stream comes out portrait
    assert_eq!((frame.width(), frame.height()), (24, 32));
}

#[tokio::test]
async fn test_configure_twice_is_rejected() {
    let camera = Arc::new(VirtualCamera::new(camera_config(Duration::from_millis(5))));
    let (mut session, _events) = session(camera);
    session.configure().await.unwrap();

    let err = session.configure().await.unwrap_err();
    assert_eq!(
        err,
        SessionError::InvalidState {
            operation: "configure",
            state: SessionState::Running,
        }
    );
    assert_eq!(session.state(), SessionState::Running);
}

#[tokio::test]
async fn test_denied_authorization_fails_session() {
    let camera = Arc::new(VirtualCamera::new(VirtualCameraConfig {
        authorization: AuthorizationStatus::Denied,
        ..camera_config(Duration::from_millis(5))
    }));
    let (mut session, _events) = session(camera);

    assert_eq!(session.configure().await, Err(SessionError::PermissionDenied));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.request_capture().is_err());
}

#[tokio::test]
async fn test_undetermined_authorization_is_requested() {
    let granted = Arc::new(VirtualCamera::new(VirtualCameraConfig {
        authorization: AuthorizationStatus::NotDetermined,
        grant_on_request: true,
        ..camera_config(Duration::from_millis(5))
    }));
    let (mut session_ok, _events) = session(granted);
    session_ok.configure().await.unwrap();

    let refused = Arc::new(VirtualCamera::new(VirtualCameraConfig {
        authorization: AuthorizationStatus::NotDetermined,
        grant_on_request: false,
        ..camera_config(Duration::from_millis(5))
    }));
    let (mut session_denied, _events) = session(refused);
    assert_eq!(
        session_denied.configure().await,
        Err(SessionError::PermissionDenied)
    );
}

#[tokio::test]
async fn test_missing_position_is_unavailable() {
    let mut config = camera_config(Duration::from_millis(5));
    config.devices.retain(|d| d.position == DevicePosition::Back);
    let camera = Arc::new(VirtualCamera::new(config));
    let (mut session, _events) = CaptureSessionController::new(
        camera,
        DevicePolicy {
            position: DevicePosition::Front,
        },
        ImageCodec::new(1),
    );

    let err = session.configure().await.unwrap_err();
    assert!(matches!(err, SessionError::DeviceUnavailable(_)));
    assert!(err.is_fatal());
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_capture_before_configure_is_invalid() {
    let camera = Arc::new(VirtualCamera::new(camera_config(Duration::from_millis(5))));
    let (session, _events) = session(camera);
    assert_eq!(
        session.request_capture(),
        Err(SessionError::InvalidState {
            operation: "capture",
            state: SessionState::Idle,
        })
    );
}

#[tokio::test]
async fn test_second_capture_is_rejected_until_first_lands() {
    let camera = Arc::new(VirtualCamera::new(camera_config(Duration::from_millis(300))));
    let (mut session, mut events) = session(camera);
    session.configure().await.unwrap();

    session.request_capture().unwrap();
    assert_eq!(session.state(), SessionState::Capturing);
    assert_eq!(
        session.request_capture(),
        Err(SessionError::CaptureAlreadyInFlight)
    );

    let SessionEvent::CaptureCompleted(base) = next_event(&mut events).await else {
        panic!("expected a photo");
    };
    // Highest preset, rotated upright
    assert_eq!((base.bitmap().width(), base.bitmap().height()), (48, 64));
    assert_eq!(session.state(), SessionState::Running);

    session.request_capture().unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::CaptureCompleted(_)
    ));
    // Exactly one outcome per request
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_malformed_still_returns_to_running() {
    let camera = Arc::new(VirtualCamera::new(camera_config(Duration::from_millis(5))));
    camera.inject_still_fault(StillFault::Malformed);
    let (mut session, mut events) = session(Arc::clone(&camera));
    session.configure().await.unwrap();

    session.request_capture().unwrap();
    let SessionEvent::CaptureFailed(err) = next_event(&mut events).await else {
        panic!("expected a failed capture");
    };
    assert!(matches!(err, CaptureError::Decode(DecodeError::Malformed(_))));
    assert_eq!(session.state(), SessionState::Running);

    session.request_capture().unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::CaptureCompleted(_)
    ));
}

#[tokio::test]
async fn test_device_error_on_still_is_not_fatal() {
    let camera = Arc::new(VirtualCamera::new(camera_config(Duration::from_millis(5))));
    camera.inject_still_fault(StillFault::DeviceError(BackendError::Busy));
    let (mut session, mut events) = session(Arc::clone(&camera));
    session.configure().await.unwrap();

    session.request_capture().unwrap();
    let SessionEvent::CaptureFailed(err) = next_event(&mut events).await else {
        panic!("expected a failed capture");
    };
    assert_eq!(err, CaptureError::Device(BackendError::Busy));
    assert_eq!(session.state(), SessionState::Running);
}

#[tokio::test]
async fn test_teardown_drops_capture_in_flight() {
    let camera = Arc::new(VirtualCamera::new(camera_config(Duration::from_millis(200))));
    let (mut session, mut events) = session(camera);
    session.configure().await.unwrap();

    session.request_capture().unwrap();
    session.teardown();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.subscribe_preview().borrow().is_none());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(session.state(), SessionState::Stopped);

    // Idempotent
    session.teardown();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(matches!(
        session.request_capture(),
        Err(SessionError::InvalidState { .. })
    ));
}

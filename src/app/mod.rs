// SPDX-License-Identifier: GPL-3.0-only

//! Interactive application core
//!
//! [`AppModel`] ties the capture session, the filter engine and the export
//! pipeline together. It runs as one task: presentation input arrives as
//! [`Message`]s, everything the user should see leaves as
//! [`PresentationEvent`]s. The presentation layer (see [`crate::terminal`])
//! never touches the session or the engine directly.
//!
//! ```text
//!  Message ──▶ ┌──────────┐ ──▶ PresentationEvent
//!              │ AppModel │
//!  session ──▶ │  (one    │ ◀── render / label / export results
//!  events      │   task)  │
//!              └──────────┘
//! ```

mod state;
mod update;

pub use state::{AppModel, Message, PresentationEvent, View};

use crate::backends::camera::{CameraBackend, CaptureSessionController, DevicePolicy};
use crate::config::Config;
use crate::errors::AppResult;
use crate::filters::FilterCatalogProvider;
use crate::media::ImageCodec;
use crate::pipelines::filter::{FilterApplicationScheduler, FilterLabel, FilterSelectionEngine};
use crate::pipelines::photo::ExportTarget;
use state::{BackgroundEvent, Control};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

impl AppModel {
    /// Build the app from configuration
    ///
    /// Nothing touches the camera until [`run`](Self::run).
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        provider: Arc<dyn FilterCatalogProvider>,
        config: &Config,
        sink: mpsc::UnboundedSender<PresentationEvent>,
    ) -> Self {
        let (session, session_events) = CaptureSessionController::new(
            backend,
            DevicePolicy::default(),
            ImageCodec::new(config.preview_downsample),
        );
        let engine = FilterSelectionEngine::new(
            FilterApplicationScheduler::new(),
            FilterLabel::new(config.label_hide_delay()),
        );
        let (background_tx, background_rx) = mpsc::unbounded_channel();

        Self {
            session,
            session_events,
            engine,
            provider,
            encoder: config.encoder(),
            export_target: ExportTarget::Directory(config.photo_directory()),
            view: View::default(),
            sink,
            background_tx,
            background_rx,
        }
    }

    /// Send exports somewhere other than the configured photo directory
    pub fn with_export_target(mut self, target: ExportTarget) -> Self {
        self.export_target = target;
        self
    }

    /// Configure the session and process input until `Quit`, until the
    /// input channel closes, or until the presentation sink goes away
    ///
    /// A session that cannot be configured is reported as
    /// [`PresentationEvent::SessionFailed`] and returned as an error.
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Message>) -> AppResult<()> {
        let mut state_rx = self.session.subscribe_state();
        self.emit(PresentationEvent::SessionState(*state_rx.borrow_and_update()));

        if let Err(e) = self.session.configure().await {
            error!(error = %e, "Camera session could not start");
            self.emit(PresentationEvent::SessionFailed(e.to_string()));
            return Err(e.into());
        }
        if let Some(device) = self.session.device() {
            info!(device = %device.name, "Camera ready");
        }

        self.load_catalog();

        let mut preview_rx = self.session.subscribe_preview();
        let mut rendered_rx = self.engine.subscribe_rendered();
        let mut label_rx = self.engine.subscribe_label();

        loop {
            tokio::select! {
                message = inbox.recv() => {
                    let Some(message) = message else {
                        debug!("Input closed");
                        break;
                    };
                    if self.update(message) == Control::Quit {
                        break;
                    }
                }
                Some(event) = self.session_events.recv() => self.handle_session_event(event),
                Some(event) = self.background_rx.recv() => self.handle_background(event),
                Ok(()) = preview_rx.changed() => {
                    let frame = preview_rx.borrow_and_update().clone();
                    if let (View::Camera, Some(frame)) = (self.view, frame) {
                        self.emit(PresentationEvent::Preview(frame));
                    }
                }
                Ok(()) = rendered_rx.changed() => {
                    let rendered = rendered_rx.borrow_and_update().clone();
                    if let Some(rendered) = rendered {
                        self.emit(PresentationEvent::Rendered(rendered));
                    }
                }
                Ok(()) = label_rx.changed() => {
                    let label = label_rx.borrow_and_update().clone();
                    self.emit(PresentationEvent::Label(label));
                }
                Ok(()) = state_rx.changed() => {
                    let state = *state_rx.borrow_and_update();
                    self.emit(PresentationEvent::SessionState(state));
                }
                () = self.sink.closed() => {
                    debug!("Presentation went away");
                    break;
                }
            }
        }

        self.session.teardown();
        info!("App stopped");
        Ok(())
    }

    /// Fetch the catalog in the background; "Original" works until it lands
    fn load_catalog(&self) {
        let load = self.provider.load_filters();
        let background = self.background_tx.clone();
        tokio::spawn(async move {
            let filters = load.await;
            let _ = background.send(BackgroundEvent::CatalogLoaded(filters));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{AuthorizationStatus, Resolution, SessionState};
    use crate::backends::virtual_camera::{VirtualCamera, VirtualCameraConfig};
    use crate::errors::TransformError;
    use crate::filters::BuiltinFilters;
    use crate::media::{BaseImage, Bitmap};
    use crate::pipelines::generation::Generation;
    use crate::pipelines::filter::SwipeDirection;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(10);

    struct Harness {
        inbox: mpsc::UnboundedSender<Message>,
        events: mpsc::UnboundedReceiver<PresentationEvent>,
        app: tokio::task::JoinHandle<AppResult<()>>,
    }

    fn small_camera() -> VirtualCameraConfig {
        let mut config = VirtualCameraConfig {
            frame_interval: Duration::from_millis(5),
            still_latency: Duration::from_millis(5),
            ..VirtualCameraConfig::default()
        };
        for device in &mut config.devices {
            device.still_resolutions = vec![Resolution::new(64, 48)];
            device.preview_resolution = Resolution::new(32, 24);
        }
        config
    }

    fn start(camera: VirtualCameraConfig, photo_dir: &std::path::Path) -> Harness {
        let config = Config {
            photo_dir: Some(photo_dir.to_path_buf()),
            ..Config::default()
        };
        let (sink, events) = mpsc::unbounded_channel();
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let app = AppModel::new(
            Arc::new(VirtualCamera::new(camera)),
            Arc::new(BuiltinFilters { cube_size: 5 }),
            &config,
            sink,
        );
        Harness {
            inbox,
            events,
            app: tokio::spawn(app.run(inbox_rx)),
        }
    }

    async fn wait_for<T>(
        events: &mut mpsc::UnboundedReceiver<PresentationEvent>,
        mut pick: impl FnMut(PresentationEvent) -> Option<T>,
    ) -> T {
        timeout(WAIT, async {
            loop {
                let event = events.recv().await.expect("app closed the sink");
                if let Some(found) = pick(event) {
                    return found;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn test_capture_filter_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = start(small_camera(), dir.path());

        wait_for(&mut h.events, |e| matches!(e, PresentationEvent::Preview(_)).then_some(())).await;
        wait_for(&mut h.events, |e| {
            matches!(e, PresentationEvent::CatalogLoaded(_)).then_some(())
        })
        .await;

        h.inbox.send(Message::Capture).unwrap();
        wait_for(&mut h.events, |e| {
            matches!(e, PresentationEvent::CaptureCompleted(_)).then_some(())
        })
        .await;

        h.inbox.send(Message::Swipe(SwipeDirection::Next)).unwrap();
        let rendered = wait_for(&mut h.events, |e| match e {
            PresentationEvent::Rendered(r) if r.filter_index == 1 => Some(r),
            _ => None,
        })
        .await;
        assert_ne!(&*rendered.filter_name, "Original");

        h.inbox.send(Message::Export).unwrap();
        let path = wait_for(&mut h.events, |e| match e {
            PresentationEvent::Exported(path) => Some(path),
            _ => None,
        })
        .await;
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());

        h.inbox.send(Message::Quit).unwrap();
        assert!(h.app.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_failure_of_superseded_render_is_not_shown() {
        let (sink, mut events) = mpsc::unbounded_channel();
        let mut app = AppModel::new(
            Arc::new(VirtualCamera::new(small_camera())),
            Arc::new(BuiltinFilters { cube_size: 5 }),
            &Config::default(),
            sink,
        );
        let photo = || BaseImage::new(Bitmap::new(image::RgbaImage::new(4, 4)));
        app.engine.set_base_image(photo());
        app.engine.set_base_image(photo());
        assert_eq!(app.engine.generation(), Generation::new(2));

        app.handle_background(BackgroundEvent::RenderFailed {
            generation: Generation::new(1),
            error: TransformError::EmptyImage,
        });
        assert!(events.try_recv().is_err());

        app.handle_background(BackgroundEvent::RenderFailed {
            generation: Generation::new(2),
            error: TransformError::EmptyImage,
        });
        let Ok(PresentationEvent::Notice(text)) = events.try_recv() else {
            panic!("expected a notice for the current render");
        };
        assert!(text.starts_with("Filter failed"));
    }

    #[tokio::test]
    async fn test_denied_permission_fails_run() {
        let dir = tempfile::tempdir().unwrap();
        let camera = VirtualCameraConfig {
            authorization: AuthorizationStatus::Denied,
            ..small_camera()
        };
        let mut h = start(camera, dir.path());

        wait_for(&mut h.events, |e| {
            matches!(e, PresentationEvent::SessionFailed(_)).then_some(())
        })
        .await;
        assert!(h.app.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_export_before_capture_is_a_notice() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = start(small_camera(), dir.path());

        wait_for(&mut h.events, |e| {
            matches!(e, PresentationEvent::SessionState(SessionState::Running)).then_some(())
        })
        .await;
        h.inbox.send(Message::Export).unwrap();
        let notice = wait_for(&mut h.events, |e| match e {
            PresentationEvent::Notice(text) => Some(text),
            _ => None,
        })
        .await;
        assert!(notice.starts_with("Export failed"));

        drop(h.inbox);
        assert!(h.app.await.unwrap().is_ok());
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! [`AppModel::update`] routes presentation input; the other handlers deal
//! with session events and finished background work.

use super::state::{AppModel, BackgroundEvent, Control, Message, PresentationEvent, View};
use crate::backends::camera::SessionEvent;
use crate::errors::SessionError;
use crate::filters::FilterCatalog;
use crate::pipelines::filter::{RenderHandle, SwipeDirection};
use crate::pipelines::photo::export_photo;
use tracing::{debug, info, warn};

impl AppModel {
    /// Handle one input message
    pub(crate) fn update(&mut self, message: Message) -> Control {
        match message {
            Message::Capture => self.handle_capture(),
            Message::Swipe(direction) => self.handle_swipe(direction),
            Message::Export => self.handle_export(),
            Message::BackToCamera => self.set_view(View::Camera),
            Message::Quit => {
                info!("Quit requested");
                return Control::Quit;
            }
        }
        Control::Continue
    }

    fn handle_capture(&mut self) {
        if self.view != View::Camera {
            debug!("Capture ignored outside camera view");
            return;
        }
        match self.session.request_capture() {
            Ok(()) => {}
            Err(SessionError::CaptureAlreadyInFlight) => {
                self.emit(PresentationEvent::Notice("Still capturing…".into()));
            }
            Err(e) => {
                warn!(error = %e, "Capture request failed");
                self.emit(PresentationEvent::Notice(e.to_string()));
            }
        }
    }

    fn handle_swipe(&mut self, direction: SwipeDirection) {
        if self.view != View::Detail {
            debug!(?direction, "Swipe ignored outside photo view");
            return;
        }
        let handle = self.engine.apply_swipe(direction);
        self.track_render(handle);
    }

    fn handle_export(&mut self) {
        let bitmap = self.engine.export_bitmap();
        let encoder = self.encoder;
        let target = self.export_target.clone();
        let background = self.background_tx.clone();
        tokio::spawn(async move {
            let result = export_photo(&encoder, bitmap, &target).await;
            let _ = background.send(BackgroundEvent::Exported(result));
        });
    }

    pub(crate) fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CaptureCompleted(base) => {
                self.emit(PresentationEvent::CaptureCompleted(base.clone()));
                self.set_view(View::Detail);
                let handle = self.engine.set_base_image(base);
                self.track_render(handle);
            }
            SessionEvent::CaptureFailed(e) => {
                self.emit(PresentationEvent::Notice(format!("No photo: {}", e)));
            }
            SessionEvent::DeviceLost => {
                self.emit(PresentationEvent::SessionFailed("Camera disconnected".into()));
            }
        }
    }

    pub(crate) fn handle_background(&mut self, event: BackgroundEvent) {
        match event {
            BackgroundEvent::CatalogLoaded(filters) => {
                let catalog = FilterCatalog::from_filters(filters);
                let count = catalog.len();
                let handle = self.engine.load_catalog(catalog);
                self.track_render(handle);
                self.emit(PresentationEvent::CatalogLoaded(count));
            }
            BackgroundEvent::RenderFailed { generation, error } => {
                if generation != self.engine.generation() {
                    debug!(%generation, error = %error, "Failure of superseded render ignored");
                    return;
                }
                self.emit(PresentationEvent::Notice(format!("Filter failed: {}", error)));
            }
            BackgroundEvent::Exported(Ok(path)) => {
                self.emit(PresentationEvent::Exported(path));
            }
            BackgroundEvent::Exported(Err(e)) => {
                warn!(error = %e, "Export failed");
                self.emit(PresentationEvent::Notice(format!("Export failed: {}", e)));
            }
        }
    }

    /// Report a failed render back to the loop; success shows up through
    /// the rendered-preview subscription
    ///
    /// Must be called right after the engine handed out `handle`, while the
    /// engine's generation is still the one the render was started for.
    fn track_render(&self, handle: Option<RenderHandle>) {
        let Some(handle) = handle else {
            return;
        };
        let generation = self.engine.generation();
        let background = self.background_tx.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => {
                    let _ = background.send(BackgroundEvent::RenderFailed { generation, error });
                }
                Err(e) => warn!(error = %e, "Render task panicked"),
            }
        });
    }

    fn set_view(&mut self, view: View) {
        if self.view != view {
            debug!(?view, "View changed");
            self.view = view;
            self.emit(PresentationEvent::View(view));
        }
    }

    pub(crate) fn emit(&self, event: PresentationEvent) {
        if self.sink.send(event).is_err() {
            debug!("Presentation sink closed");
        }
    }
}

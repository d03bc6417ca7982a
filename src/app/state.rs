// SPDX-License-Identifier: GPL-3.0-only

//! Application state and message types

use crate::backends::camera::{CaptureSessionController, SessionEvent, SessionState};
use crate::errors::{ExportError, TransformError};
use crate::filters::{Filter, FilterCatalogProvider};
use crate::media::{BaseImage, Bitmap};
use crate::pipelines::filter::{FilterSelectionEngine, LabelState, RenderedPreview, SwipeDirection};
use crate::pipelines::generation::Generation;
use crate::pipelines::photo::{ExportTarget, PhotoEncoder};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Live preview with the capture control
    #[default]
    Camera,
    /// The captured photo with swipeable filters
    Detail,
}

/// Input from the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// The capture control was pressed
    Capture,
    /// A horizontal swipe passed the gesture threshold
    Swipe(SwipeDirection),
    /// Hand the photo on screen to the export collaborator
    Export,
    /// Leave the photo and return to the live preview
    BackToCamera,
    Quit,
}

/// Output to the presentation layer
#[derive(Debug, Clone)]
pub enum PresentationEvent {
    /// Newest live preview frame
    Preview(Bitmap),
    /// A photo was captured; shown as "Original" until a render lands
    CaptureCompleted(BaseImage),
    /// A filter render for the current selection
    Rendered(RenderedPreview),
    /// Filter-name overlay
    Label(LabelState),
    SessionState(SessionState),
    View(View),
    /// The filter catalog arrived with this many entries
    CatalogLoaded(usize),
    Exported(PathBuf),
    /// Something non-fatal the user should know about
    Notice(String),
    /// The session cannot continue
    SessionFailed(String),
}

/// Results of work the app started in the background
#[derive(Debug)]
pub(crate) enum BackgroundEvent {
    CatalogLoaded(Vec<Filter>),
    /// A render failed; `generation` is the selection it was started for
    RenderFailed {
        generation: Generation,
        error: TransformError,
    },
    Exported(Result<PathBuf, ExportError>),
}

/// Whether the event loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Continue,
    Quit,
}

/// The interactive context
///
/// Owns the capture session and the filter engine. Every mutation happens
/// on the single task running [`AppModel::run`](super::AppModel::run);
/// background work reports back through channels.
pub struct AppModel {
    pub(crate) session: CaptureSessionController,
    pub(crate) session_events: mpsc::UnboundedReceiver<SessionEvent>,
    pub(crate) engine: FilterSelectionEngine,
    pub(crate) provider: Arc<dyn FilterCatalogProvider>,
    pub(crate) encoder: PhotoEncoder,
    pub(crate) export_target: ExportTarget,
    pub(crate) view: View,
    pub(crate) sink: mpsc::UnboundedSender<PresentationEvent>,
    pub(crate) background_tx: mpsc::UnboundedSender<BackgroundEvent>,
    pub(crate) background_rx: mpsc::UnboundedReceiver<BackgroundEvent>,
}

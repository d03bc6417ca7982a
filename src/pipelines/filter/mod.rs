// SPDX-License-Identifier: GPL-3.0-only

//! Swipe-driven filter preview
//!
//! ```text
//! swipe ──► FilterSelectionEngine ──► FilterApplicationScheduler ──► RenderedPreview
//!                  │                        (blocking pool)
//!                  └──► FilterLabel ──► (text, visible)
//! ```

pub mod label;
pub mod scheduler;
pub mod selection;

pub use label::{FilterLabel, LabelState};
pub use scheduler::{
    FilterApplicationScheduler, RenderHandle, RenderOutcome, RenderRequest, RenderedPreview,
};
pub use selection::{FilterSelectionEngine, FilterSelectionState, SwipeDirection};

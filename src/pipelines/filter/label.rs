// SPDX-License-Identifier: GPL-3.0-only

//! Filter-name overlay with auto-hide
//!
//! Showing the label makes it visible and arms a hide timer. Showing it
//! again before the timer fires restarts the delay: the old timer is
//! aborted and, should it fire anyway, its generation is stale and the hide
//! is ignored.

use crate::pipelines::generation::LatestSlot;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// What the overlay should display
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelState {
    pub text: String,
    pub visible: bool,
}

/// Transient filter-name label
#[derive(Debug)]
pub struct FilterLabel {
    slot: LatestSlot<LabelState>,
    hide_after: Duration,
    pending_hide: Option<JoinHandle<()>>,
}

impl FilterLabel {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            slot: LatestSlot::default(),
            hide_after,
            pending_hide: None,
        }
    }

    /// Show `text` and restart the hide delay
    pub fn show(&mut self, text: &str) {
        let generation = self.slot.claim();
        self.slot.publish(
            generation,
            LabelState {
                text: text.to_string(),
                visible: true,
            },
        );

        if let Some(previous) = self.pending_hide.take() {
            previous.abort();
        }

        let slot = self.slot.clone();
        let delay = self.hide_after;
        let text = text.to_string();
        self.pending_hide = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if slot.publish(generation, LabelState { text, visible: false }) {
                debug!(generation = generation.get(), "Filter label hidden");
            }
        }));
    }

    pub fn state(&self) -> LabelState {
        self.slot.borrow().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.slot.borrow().visible
    }

    pub fn subscribe(&self) -> watch::Receiver<LabelState> {
        self.slot.subscribe()
    }
}

impl Drop for FilterLabel {
    fn drop(&mut self) {
        if let Some(pending) = self.pending_hide.take() {
            pending.abort();
        }
    }
}

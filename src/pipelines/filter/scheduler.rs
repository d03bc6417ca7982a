// SPDX-License-Identifier: GPL-3.0-only

//! Background filter rendering with supersession
//!
//! Every [`submit`](FilterApplicationScheduler::submit) spawns one job on
//! the blocking pool. Jobs are never aborted and may finish in any order.
//! A finished job publishes its [`RenderedPreview`] only if its generation
//! is still the highest one submitted; otherwise the result is dropped.
//! The last submission therefore always determines what stays on screen.

use crate::errors::TransformError;
use crate::filters::Filter;
use crate::media::{BaseImage, Bitmap};
use crate::pipelines::generation::{Generation, LatestSlot};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// A photo with one filter applied, tagged with the request that made it
#[derive(Debug, Clone)]
pub struct RenderedPreview {
    pub bitmap: Bitmap,
    pub generation: Generation,
    pub filter_index: usize,
    pub filter_name: Arc<str>,
    /// Id of the [`BaseImage`] this was rendered from
    pub base_id: Uuid,
}

/// One render request
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub base: BaseImage,
    pub filter: Filter,
    pub filter_index: usize,
    pub generation: Generation,
}

/// What happened to a finished job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The result is now on display
    Published,
    /// A newer request arrived first; the result was dropped
    Superseded,
}

/// Completion of one submitted job
pub type RenderHandle = JoinHandle<Result<RenderOutcome, TransformError>>;

/// Runs filter jobs off the interactive task and publishes the newest result
#[derive(Debug, Clone)]
pub struct FilterApplicationScheduler {
    slot: LatestSlot<Option<RenderedPreview>>,
}

impl Default for FilterApplicationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterApplicationScheduler {
    pub fn new() -> Self {
        Self {
            slot: LatestSlot::new(None),
        }
    }

    /// Start rendering `request` in the background
    ///
    /// Returns immediately. The handle resolves once the job has finished
    /// and its result has been published or dropped; a transform failure
    /// leaves the previous preview on display.
    pub fn submit(&self, request: RenderRequest) -> RenderHandle {
        let generation = request.generation;
        self.slot.observe(generation);
        debug!(
            generation = generation.get(),
            filter = request.filter.name(),
            "Render submitted"
        );

        let slot = self.slot.clone();
        tokio::spawn(async move {
            let RenderRequest {
                base,
                filter,
                filter_index,
                generation,
            } = request;
            let base_id = base.id();
            let filter_name: Arc<str> = Arc::from(filter.name());

            let rendered = tokio::task::spawn_blocking(move || filter.apply(base.bitmap()))
                .await
                .map_err(|e| TransformError::Worker(e.to_string()))
                .and_then(|result| result);

            let bitmap = match rendered {
                Ok(bitmap) => bitmap,
                Err(e) => {
                    warn!(
                        generation = generation.get(),
                        filter = %filter_name,
                        error = %e,
                        "Filter application failed"
                    );
                    return Err(e);
                }
            };

            let preview = RenderedPreview {
                bitmap,
                generation,
                filter_index,
                filter_name: Arc::clone(&filter_name),
                base_id,
            };
            if slot.publish(generation, Some(preview)) {
                debug!(generation = generation.get(), filter = %filter_name, "Render published");
                Ok(RenderOutcome::Published)
            } else {
                debug!(
                    generation = generation.get(),
                    latest = slot.latest().get(),
                    "Render superseded, discarding"
                );
                Ok(RenderOutcome::Superseded)
            }
        })
    }

    /// Highest generation submitted so far
    pub fn latest_generation(&self) -> Generation {
        self.slot.latest()
    }

    /// The preview currently on display, if any
    pub fn current(&self) -> Option<RenderedPreview> {
        self.slot.borrow().clone()
    }

    /// Observe published previews
    pub fn subscribe(&self) -> watch::Receiver<Option<RenderedPreview>> {
        self.slot.subscribe()
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Filter selection state
//!
//! [`FilterSelectionEngine`] is driven from the interactive task only. It
//! owns the current index and the generation counter, clamps swipes at both
//! ends of the catalog, and turns every index change into one render
//! request plus a fresh label.

use super::label::{FilterLabel, LabelState};
use super::scheduler::{FilterApplicationScheduler, RenderHandle, RenderRequest, RenderedPreview};
use crate::filters::FilterCatalog;
use crate::media::{BaseImage, Bitmap};
use crate::pipelines::generation::Generation;
use tokio::sync::watch;
use tracing::{debug, info};

/// Direction of a horizontal swipe past the gesture threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Next,
    Previous,
}

/// Index of the selected filter and the token of the latest change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterSelectionState {
    pub current_index: usize,
    pub generation: Generation,
}

pub struct FilterSelectionEngine {
    catalog: FilterCatalog,
    state: FilterSelectionState,
    base: Option<BaseImage>,
    scheduler: FilterApplicationScheduler,
    label: FilterLabel,
}

impl FilterSelectionEngine {
    /// Start with "Original" only; the real catalog arrives via
    /// [`load_catalog`](Self::load_catalog)
    pub fn new(scheduler: FilterApplicationScheduler, label: FilterLabel) -> Self {
        Self::with_catalog(FilterCatalog::original_only(), scheduler, label)
    }

    pub fn with_catalog(
        catalog: FilterCatalog,
        scheduler: FilterApplicationScheduler,
        label: FilterLabel,
    ) -> Self {
        Self {
            catalog,
            state: FilterSelectionState::default(),
            base: None,
            scheduler,
            label,
        }
    }

    /// Show a newly captured photo, starting again from "Original"
    pub fn set_base_image(&mut self, base: BaseImage) -> Option<RenderHandle> {
        info!(id = %base.id(), "New photo for filtering");
        self.base = Some(base);
        self.change_index(0)
    }

    /// Replace the catalog once the provider has delivered it
    ///
    /// The index is kept, and clamped if the new catalog is shorter. If the
    /// filter under the index is a different one now, it is re-rendered.
    pub fn load_catalog(&mut self, catalog: FilterCatalog) -> Option<RenderHandle> {
        let index = self.state.current_index.min(catalog.last_index());
        let same_filter = self.catalog.name_at(self.state.current_index) == catalog.name_at(index);
        self.catalog = catalog;

        if index == self.state.current_index && same_filter {
            debug!(count = self.catalog.len(), "Catalog loaded, selection unchanged");
            return None;
        }
        self.change_index(index)
    }

    /// Move one filter forward or back; a no-op at either end
    pub fn apply_swipe(&mut self, direction: SwipeDirection) -> Option<RenderHandle> {
        let current = self.state.current_index;
        let target = match direction {
            SwipeDirection::Next if current < self.catalog.last_index() => current + 1,
            SwipeDirection::Previous if current > 0 => current - 1,
            _ => {
                debug!(?direction, index = current, "Swipe at catalog edge ignored");
                return None;
            }
        };
        self.change_index(target)
    }

    fn change_index(&mut self, index: usize) -> Option<RenderHandle> {
        self.state.current_index = index;
        self.state.generation = self.state.generation.next();
        let generation = self.state.generation;
        let name = self.catalog.name_at(index).to_string();

        debug!(index, generation = generation.get(), filter = %name, "Filter selected");
        self.label.show(&name);

        let base = self.base.clone()?;
        let filter = self.catalog.get(index)?.clone();
        Some(self.scheduler.submit(RenderRequest {
            base,
            filter,
            filter_index: index,
            generation,
        }))
    }

    pub fn state(&self) -> FilterSelectionState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn generation(&self) -> Generation {
        self.state.generation
    }

    /// Name for the overlay; "Original" until the catalog has loaded
    pub fn filter_name(&self) -> &str {
        self.catalog.name_at(self.state.current_index)
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    pub fn base_image(&self) -> Option<&BaseImage> {
        self.base.as_ref()
    }

    /// What the user is looking at, for export
    ///
    /// The newest published render of the current photo, or the photo
    /// itself if nothing has rendered yet.
    pub fn export_bitmap(&self) -> Option<Bitmap> {
        let base = self.base.as_ref()?;
        match self.scheduler.current() {
            Some(preview) if preview.base_id == base.id() => Some(preview.bitmap),
            _ => Some(base.bitmap().clone()),
        }
    }

    pub fn label_state(&self) -> LabelState {
        self.label.state()
    }

    pub fn subscribe_label(&self) -> watch::Receiver<LabelState> {
        self.label.subscribe()
    }

    pub fn subscribe_rendered(&self) -> watch::Receiver<Option<RenderedPreview>> {
        self.scheduler.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{ColorCube, Filter};
    use image::RgbaImage;
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(names: &[&str]) -> FilterSelectionEngine {
        let filters = names
            .iter()
            .map(|name| Filter::new(*name, Arc::new(ColorCube::identity(2).unwrap())))
            .collect();
        FilterSelectionEngine::with_catalog(
            FilterCatalog::from_filters(filters),
            FilterApplicationScheduler::new(),
            FilterLabel::new(Duration::from_secs(3)),
        )
    }

    #[tokio::test]
    async fn test_swipes_clamp_at_both_ends() {
        let mut engine = engine(&["Mono", "Sepia"]);
        assert!(engine.apply_swipe(SwipeDirection::Previous).is_none());
        assert_eq!(engine.state(), FilterSelectionState::default());

        engine.apply_swipe(SwipeDirection::Next);
        engine.apply_swipe(SwipeDirection::Next);
        assert_eq!(engine.current_index(), 2);
        assert_eq!(engine.generation(), Generation::new(2));

        engine.apply_swipe(SwipeDirection::Next);
        assert_eq!(engine.current_index(), 2);
        assert_eq!(engine.generation(), Generation::new(2));
        assert_eq!(engine.filter_name(), "Sepia");
    }

    #[tokio::test]
    async fn test_new_photo_resets_index_not_generation() {
        let mut engine = engine(&["Mono"]);
        let base = BaseImage::new(Bitmap::new(RgbaImage::new(2, 2)));
        engine.set_base_image(base.clone()).unwrap().await.unwrap().unwrap();
        engine.apply_swipe(SwipeDirection::Next).unwrap().await.unwrap().unwrap();
        assert_eq!(engine.generation(), Generation::new(2));

        engine.set_base_image(base).unwrap().await.unwrap().unwrap();
        assert_eq!(engine.current_index(), 0);
        assert_eq!(engine.generation(), Generation::new(3));
        assert_eq!(engine.label_state().text, "Original");
    }

    #[tokio::test]
    async fn test_catalog_arrival_keeps_selection() {
        let mut engine = FilterSelectionEngine::new(
            FilterApplicationScheduler::new(),
            FilterLabel::new(Duration::from_secs(3)),
        );
        assert_eq!(engine.filter_name(), "Original");
        assert!(engine.apply_swipe(SwipeDirection::Next).is_none());

        let catalog = FilterCatalog::from_filters(vec![Filter::new(
            "Mono",
            Arc::new(ColorCube::identity(2).unwrap()),
        )]);
        assert!(engine.load_catalog(catalog).is_none());
        assert_eq!(engine.current_index(), 0);
        assert_eq!(engine.generation(), Generation::ZERO);
    }

    #[tokio::test]
    async fn test_export_falls_back_to_base_image() {
        let mut engine = engine(&["Mono"]);
        assert!(engine.export_bitmap().is_none());

        let base = BaseImage::new(Bitmap::new(RgbaImage::new(3, 3)));
        engine.base = Some(base.clone());
        assert!(engine.export_bitmap().unwrap().ptr_eq(base.bitmap()));
    }
}

// SPDX-License-Identifier: MPL-2.0

//! Named filters and the ordered catalog
//!
//! The catalog always starts with "Original", the identity. Whatever a
//! provider delivers is appended after it; a provider's own "Original"
//! entries are dropped in favour of the pinned one.

use super::transform::{FilterTransform, Identity};
use crate::constants::ORIGINAL_FILTER_NAME;
use crate::errors::TransformError;
use crate::media::Bitmap;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A named colour transform
#[derive(Clone)]
pub struct Filter {
    name: Arc<str>,
    transform: Arc<dyn FilterTransform>,
}

impl Filter {
    pub fn new(name: impl Into<Arc<str>>, transform: Arc<dyn FilterTransform>) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }

    /// The identity entry shown first in every catalog
    pub fn original() -> Self {
        Self::new(ORIGINAL_FILTER_NAME, Arc::new(Identity))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_original(&self) -> bool {
        self.name.eq_ignore_ascii_case(ORIGINAL_FILTER_NAME)
    }

    pub fn is_identity(&self) -> bool {
        self.transform.is_identity()
    }

    /// Apply this filter. Pure and potentially slow; run it off the
    /// interactive task.
    pub fn apply(&self, image: &Bitmap) -> Result<Bitmap, TransformError> {
        self.transform.apply(image)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("transform", &self.transform)
            .finish()
    }
}

/// Ordered, immutable list of filters with "Original" at index 0
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    filters: Arc<[Filter]>,
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::original_only()
    }
}

impl FilterCatalog {
    /// The catalog before the provider has delivered anything
    pub fn original_only() -> Self {
        Self {
            filters: Arc::from(vec![Filter::original()]),
        }
    }

    /// Build a catalog from provider output, pinning "Original" first
    pub fn from_filters(filters: Vec<Filter>) -> Self {
        let provided = filters.len();
        let mut pinned = Vec::with_capacity(provided + 1);
        pinned.push(Filter::original());
        pinned.extend(filters.into_iter().filter(|f| !f.is_original()));

        if pinned.len() != provided + 1 {
            debug!("Replaced provider's Original entry with the pinned identity");
        }
        info!(count = pinned.len(), "Filter catalog loaded");

        Self {
            filters: Arc::from(pinned),
        }
    }

    /// Number of filters, including "Original". Never zero.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Always false: "Original" is always present
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.filters.len().saturating_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&Filter> {
        self.filters.get(index)
    }

    /// Name at `index`, falling back to "Original"
    pub fn name_at(&self, index: usize) -> &str {
        self.get(index).map_or(ORIGINAL_FILTER_NAME, Filter::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    /// Find a filter by name, ignoring ASCII case
    pub fn position(&self, name: &str) -> Option<usize> {
        self.filters
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(name))
    }
}

/// Supplies the named filters, typically from bundled LUT files
///
/// Loading is asynchronous and happens once. Until it completes the
/// selection engine works with [`FilterCatalog::original_only`].
pub trait FilterCatalogProvider: Send + Sync {
    fn load_filters(&self) -> BoxFuture<'static, Vec<Filter>>;
}

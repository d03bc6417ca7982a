// SPDX-License-Identifier: MPL-2.0

//! Filters applied to a captured photo
//!
//! - [`transform`]: the [`FilterTransform`] trait, [`Identity`] and
//!   [`ColorCube`]
//! - [`catalog`]: [`Filter`], [`FilterCatalog`] and the
//!   [`FilterCatalogProvider`] seam
//! - [`builtin`]: the bundled looks

pub mod builtin;
pub mod catalog;
pub mod transform;

pub use builtin::BuiltinFilters;
pub use catalog::{Filter, FilterCatalog, FilterCatalogProvider};
pub use transform::{ColorCube, FilterTransform, Identity};

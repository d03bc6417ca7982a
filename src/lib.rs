// SPDX-License-Identifier: MPL-2.0

//! SpeedLens - take a photo, then swipe through colour filters
//!
//! This library provides the core of the SpeedLens application: a capture
//! session over a camera backend, a filter catalog, and a selection engine
//! that renders filters in the background while only ever showing the
//! result of the newest swipe.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Interactive core driven by messages
//! - [`backends`]: Camera backend abstraction, session and virtual camera
//! - [`filters`]: Filter transforms, catalog and built-in looks
//! - [`media`]: Bitmaps and frame/photo decoding
//! - [`pipelines`]: Filter rendering, the name label and photo export
//! - [`config`]: User configuration handling
//! - [`terminal`]: Terminal front end
//!
//! # Example
//!
//! ```ignore
//! // Interactive viewer:
//! // speedlens
//! // One-shot capture:
//! // speedlens photo --filter Noir
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filters;
pub mod media;
pub mod pipelines;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, Message, PresentationEvent, View};
pub use config::Config;
pub use errors::{AppError, AppResult};

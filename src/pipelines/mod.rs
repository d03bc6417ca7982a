// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for captured photos
//!
//! Heavy work (filtering, encoding, disk writes) runs on background
//! workers; the interactive task only ever receives finished values.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │  BaseImage   │ ──▶ │  Filter Pipeline  │ ──▶ │ RenderedPreview  │
//! │              │     │  - selection      │     │ (newest request) │
//! │              │     │  - supersession   │     │                  │
//! └──────────────┘     └───────────────────┘     └────────┬─────────┘
//!                                                          │
//!                      ┌───────────────────┐     ┌────────▼─────────┐
//!                      │  Photo Pipeline   │ ◀── │  Export request  │
//!                      │  - JPEG / PNG     │     │                  │
//!                      └───────────────────┘     └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`generation`]: Generation tokens shared by renders and the label timer
//! - [`filter`]: Filter selection, background rendering and the name label
//! - [`photo`]: Export encoding and saving

pub mod filter;
pub mod generation;
pub mod photo;

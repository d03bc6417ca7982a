// SPDX-License-Identifier: MPL-2.0

//! Media types and decoding
//!
//! - [`bitmap`]: the shared RGBA [`Bitmap`] and the captured [`BaseImage`]
//! - [`codec`]: [`ImageCodec`], device frames and photos to upright bitmaps

pub mod bitmap;
pub mod codec;

pub use bitmap::{BaseImage, Bitmap};
pub use codec::ImageCodec;

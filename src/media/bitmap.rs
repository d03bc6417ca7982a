// SPDX-License-Identifier: MPL-2.0

//! Canonical in-memory images
//!
//! Everything past the codec works on [`Bitmap`]: an immutable RGBA8 image
//! behind an `Arc`, so handing it to a filter job or the display sink is a
//! reference-count bump rather than a pixel copy.

use chrono::{DateTime, Local};
use image::RgbaImage;
use std::sync::Arc;
use uuid::Uuid;

/// Shared, immutable RGBA8 image
#[derive(Clone)]
pub struct Bitmap(Arc<RgbaImage>);

impl Bitmap {
    pub fn new(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.0
    }

    /// Raw RGBA bytes, row-major, no padding
    pub fn as_raw(&self) -> &[u8] {
        self.0.as_raw()
    }

    /// RGBA value at (x, y), clamped to the image bounds
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width().saturating_sub(1));
        let y = y.min(self.height().saturating_sub(1));
        self.0.get_pixel(x, y).0
    }

    /// True if both bitmaps share the same allocation
    pub fn ptr_eq(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.width() == other.width()
                && self.height() == other.height()
                && self.as_raw() == other.as_raw())
    }
}

impl Eq for Bitmap {}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bitmap({}x{})", self.width(), self.height())
    }
}

/// The decoded, upright photo shown as "Original"
///
/// Exactly one exists per captured photo; the id tells renders of different
/// photos apart.
#[derive(Debug, Clone)]
pub struct BaseImage {
    id: Uuid,
    bitmap: Bitmap,
    captured_at: DateTime<Local>,
}

impl BaseImage {
    pub fn new(bitmap: Bitmap) -> Self {
        Self {
            id: Uuid::new_v4(),
            bitmap,
            captured_at: Local::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmap_equality_is_by_content() {
        let a = Bitmap::new(RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255])));
        let b = Bitmap::new(RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255])));
        let c = Bitmap::new(RgbaImage::from_pixel(2, 2, image::Rgba([9, 2, 3, 255])));
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn test_pixel_is_clamped() {
        let bitmap = Bitmap::new(RgbaImage::from_pixel(3, 1, image::Rgba([7, 7, 7, 255])));
        assert_eq!(bitmap.pixel(100, 100), [7, 7, 7, 255]);
    }

    #[test]
    fn test_base_images_have_distinct_ids() {
        let bitmap = Bitmap::new(RgbaImage::new(1, 1));
        let first = BaseImage::new(bitmap.clone());
        let second = BaseImage::new(bitmap);
        assert_ne!(first.id(), second.id());
    }
}

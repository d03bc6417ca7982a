// SPDX-License-Identifier: MPL-2.0

//! Colour transforms
//!
//! A transform is a pure function from bitmap to bitmap. Two kinds exist:
//! [`Identity`], which hands the input back untouched, and [`ColorCube`], a
//! 3D lookup table sampled with trilinear interpolation. Cube tables are
//! laid out red-fastest, as in `.cube` files.

use crate::errors::TransformError;
use crate::media::Bitmap;
use image::RgbaImage;
use std::fmt;

/// A named filter's colour operation
pub trait FilterTransform: Send + Sync + fmt::Debug {
    /// Apply the transform, producing a new bitmap of the same size
    fn apply(&self, image: &Bitmap) -> Result<Bitmap, TransformError>;

    /// True if `apply` returns its input unchanged
    fn is_identity(&self) -> bool {
        false
    }
}

/// Leaves the image as it is
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl FilterTransform for Identity {
    fn apply(&self, image: &Bitmap) -> Result<Bitmap, TransformError> {
        Ok(image.clone())
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// 3D colour lookup table
#[derive(Clone)]
pub struct ColorCube {
    size: usize,
    table: Vec<[f32; 3]>,
}

impl ColorCube {
    /// Build a cube from a table of `size³` entries in `[0, 1]`
    pub fn new(size: usize, table: Vec<[f32; 3]>) -> Result<Self, TransformError> {
        if size < 2 {
            return Err(TransformError::InvalidCube(format!(
                "cube size {} is below the minimum of 2",
                size
            )));
        }
        let expected = size * size * size;
        if table.len() != expected {
            return Err(TransformError::InvalidCube(format!(
                "expected {} entries for size {}, got {}",
                expected,
                size,
                table.len()
            )));
        }
        Ok(Self { size, table })
    }

    /// Sample `grade` at every lattice point
    pub fn from_fn(
        size: usize,
        grade: impl Fn([f32; 3]) -> [f32; 3],
    ) -> Result<Self, TransformError> {
        let step = 1.0 / (size.max(2) - 1) as f32;
        let mut table = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    let out = grade([r as f32 * step, g as f32 * step, b as f32 * step]);
                    table.push(out.map(|c| c.clamp(0.0, 1.0)));
                }
            }
        }
        Self::new(size, table)
    }

    /// The cube that maps every colour to itself
    pub fn identity(size: usize) -> Result<Self, TransformError> {
        Self::from_fn(size, |rgb| rgb)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn entry(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.table[r + g * self.size + b * self.size * self.size]
    }

    /// Look up one colour with trilinear interpolation
    pub fn lookup(&self, rgb: [f32; 3]) -> [f32; 3] {
        let max = (self.size - 1) as f32;
        let scaled = rgb.map(|c| c.clamp(0.0, 1.0) * max);
        let lo = scaled.map(|c| (c.floor() as usize).min(self.size - 2));
        let frac = [
            scaled[0] - lo[0] as f32,
            scaled[1] - lo[1] as f32,
            scaled[2] - lo[2] as f32,
        ];

        let mut out = [0.0f32; 3];
        for corner in 0..8 {
            let dr = corner & 1;
            let dg = (corner >> 1) & 1;
            let db = (corner >> 2) & 1;
            let weight =
                axis_weight(frac[0], dr) * axis_weight(frac[1], dg) * axis_weight(frac[2], db);
            if weight == 0.0 {
                continue;
            }
            let value = self.entry(lo[0] + dr, lo[1] + dg, lo[2] + db);
            for (o, v) in out.iter_mut().zip(value) {
                *o += weight * v;
            }
        }
        out
    }
}

fn axis_weight(frac: f32, upper: usize) -> f32 {
    if upper == 1 { frac } else { 1.0 - frac }
}

impl fmt::Debug for ColorCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorCube({}³)", self.size)
    }
}

impl FilterTransform for ColorCube {
    fn apply(&self, image: &Bitmap) -> Result<Bitmap, TransformError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TransformError::EmptyImage);
        }

        let source = image.image();
        let mut output = RgbaImage::new(source.width(), source.height());
        for (dst, src) in output.pixels_mut().zip(source.pixels()) {
            let [r, g, b, a] = src.0;
            let graded = self.lookup([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]);
            dst.0 = [
                to_byte(graded[0]),
                to_byte(graded[1]),
                to_byte(graded[2]),
                a,
            ];
        }
        Ok(Bitmap::new(output))
    }
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

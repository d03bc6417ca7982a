// SPDX-License-Identifier: MPL-2.0

//! Built-in colour grades
//!
//! Each look is baked into a [`ColorCube`] at load time, the way bundled
//! LUT files would be decoded by a catalog loader. Baking runs on the
//! blocking pool.

use super::catalog::{Filter, FilterCatalogProvider};
use super::transform::ColorCube;
use crate::constants::BUILTIN_CUBE_SIZE;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rec. 601 luma
fn luminance([r, g, b]: [f32; 3]) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn saturate(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    let l = luminance(rgb);
    rgb.map(|c| l + (c - l) * amount)
}

type Grade = fn([f32; 3]) -> [f32; 3];

/// Built-in looks in catalog order
pub const LOOKS: &[(&str, Grade)] = &[
    ("Mono", |rgb| [luminance(rgb); 3]),
    ("Sepia", |rgb| {
        let l = luminance(rgb);
        [l * 1.2 + 0.1, l * 0.9 + 0.05, l * 0.7]
    }),
    ("Noir", |rgb| [(luminance(rgb) - 0.5) * 2.0 + 0.5; 3]),
    ("Vivid", |rgb| {
        saturate(rgb, 1.4).map(|c| (c.clamp(0.0, 1.0) - 0.5) * 1.15 + 0.5)
    }),
    ("Cool", |[r, g, b]| [r * 0.9, g * 0.95, b * 1.1]),
    ("Warm", |[r, g, b]| [r * 1.1, g, b * 0.85]),
    ("Fade", |rgb| saturate(rgb.map(|c| c * 0.85 + 0.1), 0.7)),
    ("Duotone", |rgb| {
        let l = luminance(rgb);
        let dark = [0.1, 0.1, 0.4];
        let light = [1.0, 0.9, 0.5];
        [
            dark[0] + l * (light[0] - dark[0]),
            dark[1] + l * (light[1] - dark[1]),
            dark[2] + l * (light[2] - dark[2]),
        ]
    }),
    ("Negative", |rgb| rgb.map(|c| 1.0 - c)),
    ("Posterize", |rgb| rgb.map(|c| (c * 4.0).floor().min(3.0) / 3.0)),
    ("Solarize", |rgb| rgb.map(|c| if c > 0.5 { 1.0 - c } else { c })),
];

/// Bake every built-in look
pub fn builtin_filters(cube_size: usize) -> Vec<Filter> {
    LOOKS
        .iter()
        .filter_map(|(name, grade)| match ColorCube::from_fn(cube_size, grade) {
            Ok(cube) => Some(Filter::new(*name, Arc::new(cube))),
            Err(e) => {
                warn!(filter = *name, error = %e, "Skipping built-in filter");
                None
            }
        })
        .collect()
}

/// Provider for the built-in looks
#[derive(Debug, Clone, Copy)]
pub struct BuiltinFilters {
    pub cube_size: usize,
}

impl Default for BuiltinFilters {
    fn default() -> Self {
        Self {
            cube_size: BUILTIN_CUBE_SIZE,
        }
    }
}

impl FilterCatalogProvider for BuiltinFilters {
    fn load_filters(&self) -> BoxFuture<'static, Vec<Filter>> {
        let cube_size = self.cube_size;
        async move {
            match tokio::task::spawn_blocking(move || builtin_filters(cube_size)).await {
                Ok(filters) => {
                    debug!(count = filters.len(), "Built-in filters baked");
                    filters
                }
                Err(e) => {
                    warn!(error = %e, "Baking built-in filters failed");
                    Vec::new()
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Bitmap;
    use image::RgbaImage;

    #[test]
    fn test_all_looks_bake() {
        let filters = builtin_filters(9);
        assert_eq!(filters.len(), LOOKS.len());
        assert_eq!(filters[0].name(), "Mono");
    }

    #[test]
    fn test_mono_is_gray() {
        let filters = builtin_filters(17);
        let image = Bitmap::new(RgbaImage::from_pixel(2, 2, image::Rgba([200, 40, 90, 255])));
        let [r, g, b, a] = filters[0].apply(&image).unwrap().pixel(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_negative_inverts() {
        let negative = builtin_filters(17)
            .into_iter()
            .find(|f| f.name() == "Negative")
            .unwrap();
        let image = Bitmap::new(RgbaImage::from_pixel(1, 1, image::Rgba([0, 255, 64, 255])));
        let [r, g, b, _] = negative.apply(&image).unwrap().pixel(0, 0);
        assert_eq!((r, g), (255, 0));
        assert!((190..=192).contains(&b));
    }

    #[tokio::test]
    async fn test_provider_loads_all_looks() {
        let filters = BuiltinFilters { cube_size: 5 }.load_filters().await;
        assert_eq!(filters.len(), LOOKS.len());
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources for the virtual camera
//!
//! A source renders what the simulated sensor "sees". Sources are upright;
//! the sensor is mounted rotated, so rendering undoes the device rotation
//! first. Decoding then rotates back and the user sees the source upright.

use crate::backends::camera::types::{
    BackendError, BackendResult, FrameData, PixelFormat, RawFrame, Resolution, SensorRotation,
};
use image::{RgbaImage, imageops};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Colour bars, left to right
const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// What the virtual sensor looks at
#[derive(Debug, Clone, Default)]
pub enum FrameSource {
    /// Colour bars with a sweeping marker line
    #[default]
    TestPattern,
    /// A still image, shown for every frame
    Image(Arc<RgbaImage>),
}

impl FrameSource {
    /// Load an image file as the source
    pub fn from_path(path: &Path) -> BackendResult<Self> {
        info!(path = %path.display(), "Loading image file");

        let img = image::open(path).map_err(|e| {
            BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
        })?;
        let rgba = img.to_rgba8();
        info!(width = rgba.width(), height = rgba.height(), "Image loaded successfully");

        Ok(Self::Image(Arc::new(rgba)))
    }

    /// Render the upright scene at `size` (portrait or landscape as given)
    pub fn render_upright(&self, size: Resolution, tick: u64) -> RgbaImage {
        match self {
            FrameSource::TestPattern => test_pattern(size, tick),
            FrameSource::Image(image) => imageops::resize(
                image.as_ref(),
                size.width.max(1),
                size.height.max(1),
                imageops::FilterType::Triangle,
            ),
        }
    }

    /// Render what a sensor mounted at `rotation` outputs at `sensor_size`
    pub fn render_sensor(
        &self,
        sensor_size: Resolution,
        rotation: SensorRotation,
        tick: u64,
    ) -> RgbaImage {
        let upright_size = if rotation.swaps_dimensions() {
            Resolution::new(sensor_size.height, sensor_size.width)
        } else {
            sensor_size
        };
        let upright = self.render_upright(upright_size, tick);
        match rotation {
            SensorRotation::None => upright,
            SensorRotation::Rotate90 => imageops::rotate270(&upright),
            SensorRotation::Rotate180 => imageops::rotate180(&upright),
            SensorRotation::Rotate270 => imageops::rotate90(&upright),
        }
    }

    /// One RGBA preview frame as the device would hand it over
    pub fn raw_frame(
        &self,
        sensor_size: Resolution,
        rotation: SensorRotation,
        tick: u64,
    ) -> RawFrame {
        let image = self.render_sensor(sensor_size, rotation, tick);
        let (width, height) = image.dimensions();
        RawFrame {
            width,
            height,
            data: FrameData::from(image.into_raw()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            rotation,
            captured_at: Instant::now(),
        }
    }
}

fn test_pattern(size: Resolution, tick: u64) -> RgbaImage {
    let Resolution { width, height } = size;
    let bar_width = width.div_ceil(BARS.len() as u32).max(1);
    let marker = if width == 0 {
        0
    } else {
        (tick % width as u64) as u32
    };

    RgbaImage::from_fn(width, height, |x, y| {
        if x == marker {
            return image::Rgba([255, 255, 255, 255]);
        }
        let bar = BARS[((x / bar_width) as usize).min(BARS.len() - 1)];
        // Darken the lower quarter so orientation is visible
        let shade = if y >= height - height / 4 { 2 } else { 1 };
        image::Rgba([bar[0] / shade, bar[1] / shade, bar[2] / shade, 255])
    })
}

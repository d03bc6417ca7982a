// SPDX-License-Identifier: GPL-3.0-only

//! Frame and photo decoding
//!
//! [`ImageCodec`] turns what the device hands over into upright RGBA
//! bitmaps:
//!
//! - Preview frames arrive as raw pixel buffers (RGBA, RGB24, Gray8, NV12,
//!   YUYV) and may be downsampled, since they are only ever displayed.
//! - Still captures arrive encoded (JPEG or PNG) and are decoded at full
//!   resolution into a [`BaseImage`].
//!
//! Both are rotated by the sensor rotation tagged on the input, which turns
//! a landscape-mounted sensor's output into the portrait orientation the
//! user held the device in.

use crate::backends::camera::types::{PixelFormat, RawFrame, SensorRotation, StillCapture};
use crate::errors::DecodeError;
use crate::media::bitmap::{BaseImage, Bitmap};
use image::{RgbaImage, imageops};
use tracing::debug;

/// Stateless converter from device output to canonical bitmaps
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    /// Keep every n-th pixel in both directions for preview frames
    preview_downsample: u32,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ImageCodec {
    pub fn new(preview_downsample: u32) -> Self {
        Self {
            preview_downsample: preview_downsample.max(1),
        }
    }

    /// Decode a live preview frame for display
    ///
    /// The result is for immediate display only and must not be kept as a
    /// photo: it may be downsampled.
    pub fn decode_preview_frame(&self, frame: &RawFrame) -> Result<Bitmap, DecodeError> {
        validate_frame(frame)?;

        let step = self.preview_downsample;
        let out_width = frame.width.div_ceil(step);
        let out_height = frame.height.div_ceil(step);

        let image = RgbaImage::from_fn(out_width, out_height, |x, y| {
            let (r, g, b) = sample_pixel_rgb(frame, x * step, y * step);
            image::Rgba([r, g, b, 255])
        });

        Ok(Bitmap::new(rotate(image, frame.rotation)))
    }

    /// Decode a captured photo at full resolution
    ///
    /// Malformed bytes yield [`DecodeError::Malformed`]; the caller drops
    /// the capture and carries on.
    pub fn decode_still_capture(&self, still: &StillCapture) -> Result<BaseImage, DecodeError> {
        if still.encoded.is_empty() {
            return Err(DecodeError::Malformed("empty capture".to_string()));
        }

        let decoded = image::load_from_memory(&still.encoded)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(DecodeError::EmptyFrame);
        }

        let upright = rotate(rgba, still.rotation);
        debug!(
            width = upright.width(),
            height = upright.height(),
            rotation = %still.rotation,
            "Still capture decoded"
        );

        Ok(BaseImage::new(Bitmap::new(upright)))
    }
}

fn validate_frame(frame: &RawFrame) -> Result<(), DecodeError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(DecodeError::EmptyFrame);
    }
    let min_stride = frame.format.packed_stride(frame.width);
    if frame.stride < min_stride {
        return Err(DecodeError::Malformed(format!(
            "stride {} shorter than row of {} bytes",
            frame.stride, min_stride
        )));
    }
    let expected = frame.format.min_buffer_size(frame.height, frame.stride);
    if frame.data.len() < expected {
        return Err(DecodeError::InsufficientData {
            expected,
            actual: frame.data.len(),
        });
    }
    Ok(())
}

/// Rotate clockwise by the sensor rotation
fn rotate(image: RgbaImage, rotation: SensorRotation) -> RgbaImage {
    match rotation {
        SensorRotation::None => image,
        SensorRotation::Rotate90 => imageops::rotate90(&image),
        SensorRotation::Rotate180 => imageops::rotate180(&image),
        SensorRotation::Rotate270 => imageops::rotate270(&image),
    }
}

/// Read one pixel of a validated frame as RGB
fn sample_pixel_rgb(frame: &RawFrame, x: u32, y: u32) -> (u8, u8, u8) {
    let x = x.min(frame.width - 1) as usize;
    let y = y.min(frame.height - 1) as usize;
    let stride = frame.stride as usize;
    let data = &frame.data;

    match frame.format {
        PixelFormat::RGBA => {
            let idx = y * stride + x * 4;
            (data[idx], data[idx + 1], data[idx + 2])
        }
        PixelFormat::RGB24 => {
            let idx = y * stride + x * 3;
            (data[idx], data[idx + 1], data[idx + 2])
        }
        PixelFormat::Gray8 => {
            let v = data[y * stride + x];
            (v, v, v)
        }
        PixelFormat::NV12 => {
            let luma = data[y * stride + x];
            // UV plane follows the Y plane at half vertical resolution
            let uv_offset = stride * frame.height as usize;
            let uv_idx = uv_offset + (y / 2) * stride + (x & !1);
            match (data.get(uv_idx), data.get(uv_idx + 1)) {
                (Some(&u), Some(&v)) => yuv_to_rgb(luma, u, v),
                _ => (luma, luma, luma),
            }
        }
        PixelFormat::YUYV => {
            // Y0 U Y1 V: two pixels share chroma
            let base = y * stride + (x & !1) * 2;
            let luma = if x & 1 == 0 {
                data[base]
            } else {
                data[base + 2]
            };
            match (data.get(base + 1), data.get(base + 3)) {
                (Some(&u), Some(&v)) => yuv_to_rgb(luma, u, v),
                _ => (luma, luma, luma),
            }
        }
    }
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::FrameData;
    use std::time::Instant;

    fn rgba_frame(width: u32, height: u32, rotation: SensorRotation) -> RawFrame {
        // Red channel encodes x, green encodes y
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        RawFrame {
            width,
            height,
            data: FrameData::from(data),
            format: PixelFormat::RGBA,
            stride: width * 4,
            rotation,
            captured_at: Instant::now(),
        }
    }

    fn encode_png(image: &RgbaImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_preview_rotation_swaps_dimensions() {
        let codec = ImageCodec::new(1);
        let bitmap = codec
            .decode_preview_frame(&rgba_frame(4, 2, SensorRotation::Rotate90))
            .unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (2, 4));
        // Rotating 90° clockwise moves the bottom-left source pixel to the top-left
        assert_eq!(bitmap.pixel(0, 0), [0, 1, 0, 255]);
    }

    #[test]
    fn test_preview_downsample() {
        let codec = ImageCodec::new(2);
        let bitmap = codec
            .decode_preview_frame(&rgba_frame(5, 4, SensorRotation::None))
            .unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
        assert_eq!(bitmap.pixel(2, 1), [4, 2, 0, 255]);
    }

    #[test]
    fn test_preview_rejects_short_buffer() {
        let mut frame = rgba_frame(4, 4, SensorRotation::None);
        frame.data = FrameData::from(vec![0u8; 10]);
        let err = ImageCodec::default().decode_preview_frame(&frame).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InsufficientData {
                expected: 64,
                actual: 10
            }
        );
    }

    #[test]
    fn test_nv12_neutral_chroma_is_gray() {
        let (width, height) = (4u32, 2u32);
        let mut data = vec![100u8; (width * height) as usize];
        data.extend(vec![128u8; (width * height / 2) as usize]);
        let frame = RawFrame {
            width,
            height,
            data: FrameData::from(data),
            format: PixelFormat::NV12,
            stride: width,
            rotation: SensorRotation::None,
            captured_at: Instant::now(),
        };
        let bitmap = ImageCodec::default().decode_preview_frame(&frame).unwrap();
        assert_eq!(bitmap.pixel(3, 1), [100, 100, 100, 255]);
    }

    #[test]
    fn test_yuyv_decodes_both_pixels_of_pair() {
        let frame = RawFrame {
            width: 2,
            height: 1,
            data: FrameData::from(vec![50, 128, 200, 128]),
            format: PixelFormat::YUYV,
            stride: 4,
            rotation: SensorRotation::None,
            captured_at: Instant::now(),
        };
        let bitmap = ImageCodec::default().decode_preview_frame(&frame).unwrap();
        assert_eq!(bitmap.pixel(0, 0), [50, 50, 50, 255]);
        assert_eq!(bitmap.pixel(1, 0), [200, 200, 200, 255]);
    }

    #[test]
    fn test_yuyv_odd_width_needs_whole_last_pair() {
        let frame = |stride: u32, data: Vec<u8>| RawFrame {
            width: 3,
            height: 1,
            data: FrameData::from(data),
            format: PixelFormat::YUYV,
            stride,
            rotation: SensorRotation::None,
            captured_at: Instant::now(),
        };

        let short = frame(6, vec![10, 128, 20, 128, 30, 128]);
        assert!(matches!(
            ImageCodec::default().decode_preview_frame(&short),
            Err(DecodeError::Malformed(_))
        ));

        let padded = frame(8, vec![10, 128, 20, 128, 30, 128, 0, 128]);
        let bitmap = ImageCodec::default().decode_preview_frame(&padded).unwrap();
        assert_eq!(bitmap.width(), 3);
        assert_eq!(bitmap.pixel(2, 0), [30, 30, 30, 255]);
    }

    #[test]
    fn test_still_decode_is_full_resolution_and_upright() {
        let source = RgbaImage::from_fn(6, 3, |x, y| image::Rgba([x as u8, y as u8, 9, 255]));
        let still = StillCapture {
            encoded: FrameData::from(encode_png(&source)),
            rotation: SensorRotation::Rotate90,
            captured_at: Instant::now(),
        };
        let base = ImageCodec::new(4).decode_still_capture(&still).unwrap();
        assert_eq!((base.bitmap().width(), base.bitmap().height()), (3, 6));
        assert_eq!(base.bitmap().pixel(0, 0), [0, 2, 9, 255]);
    }

    #[test]
    fn test_malformed_still_is_decode_error() {
        let still = StillCapture {
            encoded: FrameData::from(vec![0xFF, 0xD8, 0x00, 0x13, 0x37]),
            rotation: SensorRotation::Rotate90,
            captured_at: Instant::now(),
        };
        let err = ImageCodec::default().decode_still_capture(&still).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}

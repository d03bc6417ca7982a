// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding for the export handoff
//!
//! Encodes a rendered photo as:
//! - JPEG (with quality control)
//! - PNG (lossless)
//!
//! Encoding and disk writes run on the blocking pool.

use crate::errors::ExportError;
use crate::media::Bitmap;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    #[default]
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }

    /// Pick a format from a file extension, case-insensitively
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(EncodingFormat::Jpeg),
            "png" => Some(EncodingFormat::Png),
            _ => None,
        }
    }
}

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Encoded image data ready for saving
#[derive(Debug)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

/// Photo encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    quality: EncodingQuality,
}

impl PhotoEncoder {
    pub fn new(format: EncodingFormat, quality: EncodingQuality) -> Self {
        Self { format, quality }
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// Encode a bitmap on the blocking pool
    pub async fn encode(&self, bitmap: Bitmap) -> Result<EncodedImage, ExportError> {
        info!(
            width = bitmap.width(),
            height = bitmap.height(),
            format = ?self.format,
            "Starting encoding"
        );

        let format = self.format;
        let quality = self.quality;
        tokio::task::spawn_blocking(move || {
            let data = match format {
                EncodingFormat::Jpeg => encode_jpeg(&bitmap, quality)?,
                EncodingFormat::Png => encode_png(&bitmap)?,
            };
            debug!(size = data.len(), "Encoding complete");
            Ok(EncodedImage {
                data,
                format,
                width: bitmap.width(),
                height: bitmap.height(),
            })
        })
        .await
        .map_err(|e| ExportError::Task(e.to_string()))?
    }

    /// Save into `output_dir` under a timestamped name
    ///
    /// Names look like `IMG_20240131_142501.jpg`; a numeric suffix is added
    /// if that name is already taken.
    pub async fn save(
        &self,
        encoded: EncodedImage,
        output_dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let output_dir = output_dir.to_path_buf();
        let extension = encoded.format.extension();

        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&output_dir)?;
            let mut filepath = output_dir.join(format!("IMG_{}.{}", timestamp, extension));
            let mut counter = 1;
            while filepath.exists() {
                filepath = output_dir.join(format!("IMG_{}_{}.{}", timestamp, counter, extension));
                counter += 1;
            }
            write_file(&filepath, &encoded.data)?;
            Ok(filepath)
        })
        .await
        .map_err(|e| ExportError::Task(e.to_string()))?
    }

    /// Save to an exact path, creating parent directories
    pub async fn save_to(
        &self,
        encoded: EncodedImage,
        path: &Path,
    ) -> Result<PathBuf, ExportError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            write_file(&path, &encoded.data)?;
            Ok(path)
        })
        .await
        .map_err(|e| ExportError::Task(e.to_string()))?
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), ExportError> {
    info!(path = %path.display(), "Saving photo");
    std::fs::write(path, data)?;
    info!(path = %path.display(), bytes = data.len(), "Photo saved successfully");
    Ok(())
}

/// JPEG has no alpha; drop it
fn encode_jpeg(bitmap: &Bitmap, quality: EncodingQuality) -> Result<Vec<u8>, ExportError> {
    let rgb = DynamicImage::ImageRgba8(bitmap.image().clone()).to_rgb8();
    let mut buffer = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_quality());
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}

fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    bitmap
        .image()
        .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn sample() -> Bitmap {
        Bitmap::new(RgbaImage::from_fn(8, 4, |x, y| {
            image::Rgba([x as u8 * 30, y as u8 * 60, 128, 255])
        }))
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
        assert_eq!(EncodingFormat::from_extension("JPEG"), Some(EncodingFormat::Jpeg));
        assert_eq!(EncodingFormat::from_extension("tiff"), None);
    }

    #[test]
    fn test_jpeg_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 98);
    }

    #[tokio::test]
    async fn test_png_is_lossless() {
        let encoder = PhotoEncoder::new(EncodingFormat::Png, EncodingQuality::High);
        let encoded = encoder.encode(sample()).await.unwrap();
        let decoded = image::load_from_memory(&encoded.data).unwrap().to_rgba8();
        assert_eq!(&decoded, sample().image());
    }

    #[tokio::test]
    async fn test_save_avoids_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = PhotoEncoder::default();

        let first = encoder
            .save(encoder.encode(sample()).await.unwrap(), dir.path())
            .await
            .unwrap();
        let second = encoder
            .save(encoder.encode(sample()).await.unwrap(), dir.path())
            .await
            .unwrap();

        assert_ne!(first, second);
        assert!(first.file_name().unwrap().to_string_lossy().starts_with("IMG_"));
        assert_eq!(first.extension().unwrap(), "jpg");
        assert!(second.exists());
    }
}

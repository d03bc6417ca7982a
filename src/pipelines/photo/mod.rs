// SPDX-License-Identifier: MPL-2.0

//! Export handoff
//!
//! ```text
//! RenderedPreview (or BaseImage) → Encoding → Disk I/O
//! ```
//!
//! The pipeline exposes whatever the user is looking at for an external
//! share/export collaborator; here that collaborator is the filesystem.

pub mod encoding;

pub use encoding::{EncodedImage, EncodingFormat, EncodingQuality, PhotoEncoder};

use crate::errors::ExportError;
use crate::media::Bitmap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where an export should land
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// Timestamped file inside this directory
    Directory(PathBuf),
    /// This exact file
    File(PathBuf),
}

/// Encode and write one photo
pub async fn export_photo(
    encoder: &PhotoEncoder,
    bitmap: Option<Bitmap>,
    target: &ExportTarget,
) -> Result<PathBuf, ExportError> {
    let bitmap = bitmap.ok_or(ExportError::NothingToExport)?;
    let encoded = encoder.encode(bitmap).await?;
    let path = match target {
        ExportTarget::Directory(dir) => encoder.save(encoded, dir).await?,
        ExportTarget::File(path) => encoder.save_to(encoded, path).await?,
    };
    info!(path = %path.display(), "Photo exported");
    Ok(path)
}

/// Encoder matching a target file's extension, falling back to `default`
pub fn encoder_for_path(
    path: &Path,
    default: PhotoEncoder,
    quality: EncodingQuality,
) -> PhotoEncoder {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(EncodingFormat::from_extension)
        .map_or(default, |format| PhotoEncoder::new(format, quality))
}

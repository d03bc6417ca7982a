// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration and export

use image::{Rgba, RgbaImage};
use speedlens::Config;
use speedlens::errors::{AppError, ExportError};
use speedlens::media::Bitmap;
use speedlens::pipelines::photo::{
    EncodingFormat, EncodingQuality, ExportTarget, PhotoEncoder, export_photo,
};
use std::path::PathBuf;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.label_hide_ms, 3000);
    assert!(config.worker_threads >= 1);
    assert!(config.preview_downsample >= 1);
}

#[test]
fn test_config_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        photo_dir: Some(PathBuf::from("/tmp/shots")),
        label_hide_ms: 1200,
        export_format: EncodingFormat::Png,
        export_quality: EncodingQuality::Maximum,
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.photo_directory(), PathBuf::from("/tmp/shots"));
}

#[test]
fn test_missing_config_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
}

fn bitmap() -> Bitmap {
    Bitmap::new(RgbaImage::from_fn(12, 8, |x, y| {
        Rgba([(x * 20) as u8, (y * 30) as u8, 90, 255])
    }))
}

#[tokio::test]
async fn test_export_to_directory_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = PhotoEncoder::new(EncodingFormat::Jpeg, EncodingQuality::High);
    let target = ExportTarget::Directory(dir.path().join("photos"));

    let first = export_photo(&encoder, Some(bitmap()), &target).await.unwrap();
    let second = export_photo(&encoder, Some(bitmap()), &target).await.unwrap();

    assert_ne!(first, second);
    assert!(first.exists() && second.exists());
    assert_eq!(first.extension().unwrap(), "jpg");
}

#[tokio::test]
async fn test_png_export_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot.png");
    let encoder = PhotoEncoder::new(EncodingFormat::Png, EncodingQuality::default());
    let original = bitmap();

    let saved = export_photo(&encoder, Some(original.clone()), &ExportTarget::File(path.clone()))
        .await
        .unwrap();
    assert_eq!(saved, path);

    let reloaded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(reloaded.as_raw(), original.as_raw());
}

#[tokio::test]
async fn test_export_without_photo() {
    let dir = tempfile::tempdir().unwrap();
    let err = export_photo(
        &PhotoEncoder::default(),
        None,
        &ExportTarget::Directory(dir.path().to_path_buf()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ExportError::NothingToExport));
}

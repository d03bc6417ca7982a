// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Listing filters
//! - Taking a filtered photo without the interactive viewer

use speedlens::backends::camera::{
    CameraBackend, CaptureSessionController, DevicePolicy, DevicePosition, SessionEvent,
};
use speedlens::config::Config;
use speedlens::filters::{BuiltinFilters, FilterCatalog, FilterCatalogProvider};
use speedlens::media::ImageCodec;
use speedlens::pipelines::filter::{
    FilterApplicationScheduler, FilterLabel, FilterSelectionEngine, RenderHandle, SwipeDirection,
};
use speedlens::pipelines::photo::{ExportTarget, encoder_for_path, export_photo};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::time::timeout;

/// How long to wait for the first preview frame and for the still
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// List all available cameras
pub fn list_cameras(backend: &dyn CameraBackend) -> Result<(), Box<dyn std::error::Error>> {
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", backend.name());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {} ({:?})", index, camera.name, camera.position);
        println!("      Preview: {}", camera.preview_resolution);

        let mut stills = camera.still_resolutions.clone();
        stills.sort_by_key(|r| std::cmp::Reverse(r.pixels()));
        let res_strs: Vec<String> = stills.iter().map(ToString::to_string).collect();
        println!("      Stills:  {}", res_strs.join(", "));
        println!();
    }

    Ok(())
}

/// List the filter catalog in swipe order
pub fn list_filters(runtime: &Runtime) -> Result<(), Box<dyn std::error::Error>> {
    let filters = runtime.block_on(BuiltinFilters::default().load_filters());
    let catalog = FilterCatalog::from_filters(filters);

    println!("Filters:");
    for (index, filter) in catalog.iter().enumerate() {
        println!("  [{}] {}", index, filter.name());
    }
    Ok(())
}

/// Capture one photo, apply a filter and export it
pub fn take_photo(
    runtime: &Runtime,
    backend: Arc<dyn CameraBackend>,
    config: &Config,
    front: bool,
    filter: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let policy = DevicePolicy {
        position: if front {
            DevicePosition::Front
        } else {
            DevicePosition::Back
        },
    };

    let target = match output {
        Some(path) if path.is_dir() => ExportTarget::Directory(path),
        Some(path) => ExportTarget::File(path),
        None => ExportTarget::Directory(config.photo_directory()),
    };
    let encoder = match &target {
        ExportTarget::File(path) => encoder_for_path(path, config.encoder(), config.export_quality),
        ExportTarget::Directory(_) => config.encoder(),
    };

    runtime.block_on(async {
        let (mut session, mut events) = CaptureSessionController::new(
            backend,
            policy,
            ImageCodec::new(config.preview_downsample),
        );
        session.configure().await?;
        if let Some(device) = session.device() {
            println!("Using camera: {}", device.name);
        }

        // Wait for the stream to produce a frame before asking for a still
        let mut preview = session.subscribe_preview();
        timeout(CAPTURE_TIMEOUT, preview.wait_for(Option::is_some))
            .await
            .map_err(|_| "No preview frame from camera")??;

        let catalog = FilterCatalog::from_filters(BuiltinFilters::default().load_filters().await);
        let index = match filter.as_deref() {
            Some(name) => catalog.position(name).ok_or_else(|| {
                let names: Vec<&str> = catalog.iter().map(|f| f.name()).collect();
                format!("Unknown filter '{}' (available: {})", name, names.join(", "))
            })?,
            None => 0,
        };

        println!("Capturing...");
        session.request_capture()?;
        let base = loop {
            let event = timeout(CAPTURE_TIMEOUT, events.recv())
                .await
                .map_err(|_| "Timed out waiting for the photo")?;
            match event {
                Some(SessionEvent::CaptureCompleted(base)) => break base,
                Some(SessionEvent::CaptureFailed(e)) => return Err(e.into()),
                Some(SessionEvent::DeviceLost) | None => return Err("Camera disconnected".into()),
            }
        };
        session.teardown();
        println!(
            "Captured {}x{}",
            base.bitmap().width(),
            base.bitmap().height()
        );

        let mut engine = FilterSelectionEngine::with_catalog(
            catalog,
            FilterApplicationScheduler::new(),
            FilterLabel::new(config.label_hide_delay()),
        );
        let mut last: Option<RenderHandle> = engine.set_base_image(base);
        for _ in 0..index {
            last = engine.apply_swipe(SwipeDirection::Next).or(last);
        }
        if let Some(handle) = last {
            handle.await??;
        }
        println!("Filter: {}", engine.filter_name());

        let path = export_photo(&encoder, engine.export_bitmap(), &target).await?;
        println!("Photo saved: {}", path.display());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

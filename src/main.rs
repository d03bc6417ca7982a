// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use speedlens::backends::camera::CameraBackend;
use speedlens::backends::virtual_camera::{FrameSource, VirtualCamera, VirtualCameraConfig};
use speedlens::config::Config;
use speedlens::filters::BuiltinFilters;
use speedlens::pipelines::photo::ExportTarget;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod cli;

#[derive(Parser)]
#[command(name = "speedlens")]
#[command(about = "Take a photo, then swipe through colour filters")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Image to stream through the virtual camera instead of the test pattern
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Config file (default: <config dir>/speedlens/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive viewer in the terminal (default)
    Terminal {
        /// Directory for saved photos (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available cameras
    List,

    /// List filters in swipe order
    Filters,

    /// Take a photo with a filter applied
    Photo {
        /// Filter name (from 'speedlens filters'); default "Original"
        #[arg(short, long)]
        filter: Option<String>,

        /// Use the front camera
        #[arg(long)]
        front: bool,

        /// Output file or directory (default: ~/Pictures/speedlens/IMG_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=speedlens=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .max_blocking_threads(config.blocking_threads.max(1))
        .thread_name("speedlens-worker")
        .enable_all()
        .build()?;
    let backend = virtual_backend(cli.source.as_deref())?;

    match cli.command {
        None => run_terminal(&runtime, backend, &config, None),
        Some(Commands::Terminal { output }) => run_terminal(&runtime, backend, &config, output),
        Some(Commands::List) => cli::list_cameras(backend.as_ref()),
        Some(Commands::Filters) => cli::list_filters(&runtime),
        Some(Commands::Photo {
            filter,
            front,
            output,
        }) => cli::take_photo(&runtime, backend, &config, front, filter, output),
    }
}

fn virtual_backend(
    source: Option<&Path>,
) -> Result<Arc<dyn CameraBackend>, Box<dyn std::error::Error>> {
    let source = match source {
        Some(path) => {
            info!(path = %path.display(), "Streaming image through virtual camera");
            FrameSource::from_path(path)?
        }
        None => FrameSource::default(),
    };
    Ok(Arc::new(VirtualCamera::new(VirtualCameraConfig {
        source,
        ..VirtualCameraConfig::default()
    })))
}

fn run_terminal(
    runtime: &tokio::runtime::Runtime,
    backend: Arc<dyn CameraBackend>,
    config: &Config,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    speedlens::terminal::run(
        runtime,
        backend,
        Arc::new(BuiltinFilters::default()),
        config,
        output.map(ExportTarget::Directory),
    )
}

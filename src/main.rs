// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use mobile_camera::backends::motion::DeviceOrientation;
use mobile_camera::flash::FlashMode;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "mobile-camera")]
#[command(about = "Capture pipeline for a multi-lens camera, driven against simulated hardware")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available camera modules
    List,

    /// Show which module and ratio a zoom factor maps to
    Zoom {
        /// Zoom factor relative to the wide module
        factor: f64,

        /// Map as if the device had no telephoto module
        #[arg(long)]
        no_telephoto: bool,
    },

    /// Take a photo and store it as a three-tier asset
    Photo {
        /// Zoom factor to capture at
        #[arg(short, long, default_value = "1.0")]
        zoom: f64,

        /// Device orientation at capture time
        #[arg(long, default_value = "portrait")]
        orientation: DeviceOrientation,

        /// Flash mode (off, on, auto)
        #[arg(short, long, default_value = "off")]
        flash: FlashMode,

        /// Output directory (default: configured capture directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Location string to record on the asset
        #[arg(short, long)]
        location: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=mobile_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Zoom {
            factor,
            no_telephoto,
        } => cli::show_zoom(factor, no_telephoto),
        Commands::Photo {
            zoom,
            orientation,
            flash,
            output,
            location,
        } => cli::take_photo(zoom, orientation, flash, output, location),
    }
}

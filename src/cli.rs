// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands driven against the simulated camera
//!
//! This module provides command-line functionality for:
//! - Listing available camera modules
//! - Showing how a zoom factor maps onto the modules
//! - Taking photos through the full capture pipeline

use mobile_camera::backends::camera::{CameraBackend, CameraType, SimulatedBackend, ZoomMapper};
use mobile_camera::backends::motion::{DeviceOrientation, ScriptedMotion};
use mobile_camera::flash::FlashMode;
use mobile_camera::{CameraController, Config, MemoryCatalog};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// List all available camera modules
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let devices = SimulatedBackend::new().enumerate_devices();

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        let caps = &device.capabilities;
        println!("  [{}] {} ({})", index, device.name, device.camera_type);
        println!(
            "      Optical: {:.1}x  Aperture: f/{:.1}  Sensor: {}x{}",
            device.native_optical_factor, device.aperture, device.sensor_width, device.sensor_height
        );
        println!(
            "      ISO: {:.0}-{:.0}  Zoom: {:.1}-{:.1}x",
            caps.iso.min, caps.iso.max, caps.zoom.min, caps.zoom.max
        );
        println!();
    }

    Ok(())
}

/// Print the module and ratio a zoom factor resolves to
pub fn show_zoom(factor: f64, no_telephoto: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let devices: Vec<_> = SimulatedBackend::new()
        .enumerate_devices()
        .into_iter()
        .filter(|d| !(no_telephoto && d.camera_type == CameraType::Telephoto))
        .collect();

    let target = ZoomMapper::for_devices(config.zoom, &devices).map(factor);
    println!(
        "{:.2}x -> {} at {:.3}",
        factor, target.camera_type, target.ratio
    );
    Ok(())
}

/// Take a photo and store it as an asset
pub fn take_photo(
    zoom: f64,
    orientation: DeviceOrientation,
    flash: FlashMode,
    output: Option<PathBuf>,
    location: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load();
    if output.is_some() {
        config.capture_dir = output;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let catalog = Arc::new(MemoryCatalog::new());
        let mut controller = CameraController::start(
            config,
            Box::new(SimulatedBackend::new()),
            Box::new(ScriptedMotion::holding(orientation)),
            catalog,
        )
        .await;

        if !controller.is_enabled() {
            return Err("No cameras found".into());
        }

        // Wait for the sampler to report how the device is held
        let mut orientation_rx = controller.subscribe_orientation();
        tokio::time::timeout(
            Duration::from_secs(2),
            orientation_rx.wait_for(|current| *current == orientation),
        )
        .await
        .map_err(|_| "Orientation sensor did not settle")??;

        controller.zoom(zoom).await?;
        controller.set_flash(flash);

        if let Some(snapshot) = controller.session_snapshot() {
            if let Some(device) = snapshot.device {
                println!("Using camera: {} at {:.3}", device.name, snapshot.zoom_ratio);
            }
        }

        let asset = controller.capture(location).await?;
        println!("Photo saved: {}", asset.original_path.display());
        println!("  Preview:   {}", asset.preview_path.display());
        println!("  Thumbnail: {}", asset.thumbnail_path.display());
        println!(
            "  {} | ISO {} | f/{:.1} | {}",
            asset.lens_label, asset.iso, asset.aperture, asset.shutter_speed
        );

        controller.shutdown();
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

// SPDX-License-Identifier: MPL-2.0

//! End-to-end tests for the capture workflow against simulated hardware

use mobile_camera::backends::camera::{CameraType, SimulatedBackend};
use mobile_camera::backends::motion::{DeviceOrientation, ScriptedMotion};
use mobile_camera::constants::{LensProfile, ShutterSpeed};
use mobile_camera::session::SettingOutcome;
use mobile_camera::storage::AssetRole;
use mobile_camera::{
    CameraController, CameraError, CaptureState, Config, FlashMode, MemoryCatalog,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    controller: CameraController,
    backend: SimulatedBackend,
    catalog: Arc<MemoryCatalog>,
    dir: TempDir,
}

async fn start_with(backend: SimulatedBackend, motion: ScriptedMotion) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.capture_dir = Some(dir.path().to_path_buf());

    let catalog = Arc::new(MemoryCatalog::new());
    let controller = CameraController::start(
        config,
        Box::new(backend.clone()),
        Box::new(motion),
        catalog.clone(),
    )
    .await;

    Harness {
        controller,
        backend,
        catalog,
        dir,
    }
}

async fn start_small() -> Harness {
    start_with(
        SimulatedBackend::new().with_sensor_size(64, 48),
        ScriptedMotion::upright(),
    )
    .await
}

fn long_edge(path: &Path) -> u32 {
    let (w, h) = image::image_dimensions(path).expect("readable jpeg");
    w.max(h)
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_full_resolution_capture_produces_three_tiers() {
    let harness = start_with(SimulatedBackend::new(), ScriptedMotion::upright()).await;
    let controller = &harness.controller;

    let asset = controller
        .capture(Some("Lisbon".to_string()))
        .await
        .expect("capture succeeds");

    assert_eq!(controller.capture_state(), CaptureState::Saved);
    assert_eq!(long_edge(&asset.original_path), 4032);
    assert!(long_edge(&asset.preview_path) <= 1600);
    assert!(long_edge(&asset.thumbnail_path) <= 512);

    let size = |role| std::fs::metadata(asset.path(role)).expect("file").len();
    assert!(size(AssetRole::Thumbnail) <= size(AssetRole::Preview));
    assert!(size(AssetRole::Preview) <= size(AssetRole::Original));

    assert_eq!(asset.location.as_deref(), Some("Lisbon"));
    assert_eq!(asset.lens_label, "35mm");
    assert_eq!(asset.iso, 100);
    assert_eq!(asset.shutter_speed, "1/125");
    assert_eq!(harness.catalog.len(), 1);
}

#[tokio::test]
async fn test_orientation_is_baked_into_pixels() {
    let harness = start_with(
        SimulatedBackend::new().with_sensor_size(64, 48),
        ScriptedMotion::holding(DeviceOrientation::LandscapeLeft),
    )
    .await;
    let controller = &harness.controller;

    let mut orientation = controller.subscribe_orientation();
    tokio::time::timeout(
        Duration::from_secs(2),
        orientation.wait_for(|o| *o == DeviceOrientation::LandscapeLeft),
    )
    .await
    .expect("orientation settles")
    .expect("sampler running");

    let asset = controller.capture(None).await.expect("capture");
    assert_eq!(
        image::image_dimensions(&asset.original_path).expect("jpeg"),
        (64, 48)
    );
}

#[tokio::test]
async fn test_portrait_capture_is_upright() {
    let harness = start_small().await;
    let asset = harness.controller.capture(None).await.expect("capture");
    assert_eq!(
        image::image_dimensions(&asset.original_path).expect("jpeg"),
        (48, 64)
    );
}

#[tokio::test]
async fn test_second_capture_is_rejected_while_in_flight() {
    let harness = start_small().await;
    harness
        .backend
        .set_capture_delay(Duration::from_millis(300));
    let controller = &harness.controller;

    let first = controller.start_capture(None).expect("first capture starts");
    let second = controller.start_capture(None);
    assert!(matches!(second, Err(CameraError::CaptureInProgress)));
    assert!(controller.capture_state().is_busy());

    let asset = first.await.expect("task").expect("first capture completes");
    assert_eq!(controller.capture_state(), CaptureState::Saved);
    assert!(asset.original_path.exists());
    assert_eq!(harness.catalog.len(), 1);
    assert_eq!(harness.backend.log().captures, 1);
}

#[tokio::test]
async fn test_capture_is_rejected_while_processing() {
    let harness = start_with(SimulatedBackend::new(), ScriptedMotion::upright()).await;
    let controller = &harness.controller;

    let first = controller.start_capture(None).expect("first capture starts");
    let mut states = controller.subscribe_capture_state();
    states
        .wait_for(|state| *state == CaptureState::Processing)
        .await
        .expect("workflow alive");
    assert!(matches!(
        controller.start_capture(None),
        Err(CameraError::CaptureInProgress)
    ));

    first.await.expect("task").expect("first capture completes");
    assert_eq!(controller.capture_state(), CaptureState::Saved);
    assert_eq!(harness.catalog.len(), 1);
    assert_eq!(harness.backend.log().captures, 1);
}

#[tokio::test]
async fn test_hardware_failure_surfaces_as_failure_state() {
    let harness = start_small().await;
    harness.backend.fail_capture(true);
    let controller = &harness.controller;

    assert!(controller.capture(None).await.is_err());
    let state = controller.capture_state();
    assert!(state.failure_message().is_some(), "got {:?}", state);
    assert_eq!(files_in(harness.dir.path()), 0);

    // The user can simply try again
    harness.backend.fail_capture(false);
    controller.capture(None).await.expect("retry succeeds");
    assert_eq!(controller.capture_state(), CaptureState::Saved);
}

#[tokio::test]
async fn test_catalog_failure_removes_written_files() {
    let harness = start_small().await;
    harness.catalog.reject_inserts(true);

    assert!(harness.controller.capture(None).await.is_err());
    assert!(harness.controller.capture_state().failure_message().is_some());
    assert_eq!(files_in(harness.dir.path()), 0);
    assert!(harness.catalog.is_empty());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let harness = start_small().await;
    let controller = &harness.controller;
    let asset = controller.capture(None).await.expect("capture");

    std::fs::remove_file(&asset.original_path).expect("manual removal");
    std::fs::remove_file(&asset.preview_path).expect("manual removal");

    controller.delete_asset(&asset).await.expect("delete succeeds");
    controller.delete_asset(&asset).await.expect("second delete succeeds");
    assert!(!asset.thumbnail_path.exists());
    assert!(harness.catalog.is_empty());
}

#[tokio::test]
async fn test_location_respects_setting() {
    let harness = start_small().await;
    let controller = &harness.controller;
    controller.set_store_location(false);

    let asset = controller
        .capture(Some("Porto".to_string()))
        .await
        .expect("capture");
    assert_eq!(asset.location, None);
}

#[tokio::test]
async fn test_flash_and_manual_shutter_reach_the_asset() {
    let harness = start_small().await;
    let controller = &harness.controller;

    controller.toggle_flash();
    let outcome = controller.set_shutter(Some(ShutterSpeed::OneOver500)).await;
    assert!(matches!(outcome, SettingOutcome::Applied(_)));

    let asset = controller.capture(None).await.expect("capture");
    assert_eq!(asset.shutter_speed, "1/500");
    assert_eq!(asset.iso, 200);
    assert_eq!(harness.backend.log().last_flash, Some(FlashMode::On));
    assert_eq!(
        controller.controls().shutter,
        Some(ShutterSpeed::OneOver500)
    );
}

#[tokio::test]
async fn test_zoom_and_macro_update_controls() {
    let harness = start_small().await;
    let controller = &harness.controller;

    controller.zoom(5.0).await.expect("zoom");
    let snapshot = controller.session_snapshot().expect("enabled");
    assert_eq!(
        snapshot.device.map(|d| d.camera_type),
        Some(CameraType::Telephoto)
    );
    assert_eq!(controller.controls().lens, None);
    assert_eq!(controller.controls().lens_label(), "120mm");

    controller.toggle_macro().await.expect("macro");
    let controls = controller.controls();
    assert!(controls.macro_mode);
    assert_eq!(controls.lens_label(), "Macro");
    assert_eq!(
        controller
            .session_snapshot()
            .and_then(|s| s.device)
            .map(|d| d.camera_type),
        Some(CameraType::UltraWide)
    );

    let asset = controller.capture(None).await.expect("capture");
    assert_eq!(asset.lens_label, "Macro");
}

#[tokio::test]
async fn test_failed_zoom_keeps_lens_preset() {
    let harness = start_small().await;
    let controller = &harness.controller;
    controller
        .set_lens_preset(LensProfile::Wide)
        .await
        .expect("lens");

    harness.backend.fail_bind(CameraType::Telephoto, true);
    assert!(controller.zoom(6.0).await.is_err());
    assert_eq!(controller.controls().lens, Some(LensProfile::Wide));
}

#[tokio::test]
async fn test_focus_lock_follows_camera_switches() {
    let harness = start_small().await;
    let controller = &harness.controller;

    controller.lock();
    controller.zoom(5.0).await.expect("zoom");
    assert!(controller.focus_state().is_locked());
    assert!(harness.backend.log().focus_locked);

    // The ultra-wide module cannot meter at a point, so the lock is gone
    controller.toggle_macro().await.expect("macro");
    assert!(!harness.backend.log().focus_locked);
    assert!(!controller.focus_state().is_locked());
}

#[tokio::test]
async fn test_no_camera_runs_disabled() {
    let harness = start_with(
        SimulatedBackend::with_devices(vec![]),
        ScriptedMotion::upright(),
    )
    .await;
    let controller = &harness.controller;

    assert!(!controller.is_enabled());
    assert!(controller.devices().is_empty());
    assert!(matches!(
        controller.zoom(2.0).await,
        Err(CameraError::NoCameraFound)
    ));
    assert_eq!(controller.set_iso(Some(400.0)).await, SettingOutcome::Unsupported);

    assert!(controller.capture(None).await.is_err());
    assert!(controller.capture_state().failure_message().is_some());

    controller.reset_capture_state();
    assert_eq!(controller.capture_state(), CaptureState::Idle);
}

// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use mobile_camera::Config;
use mobile_camera::constants::LensProfile;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(
        config.store_location,
        "Location storage should be enabled by default"
    );
    assert_eq!(config.default_lens, LensProfile::Standard);
    assert!(config.capture_dir.is_none());
}

#[test]
fn test_zoom_thresholds_are_ordered() {
    let zoom = Config::default().zoom;
    assert!(zoom.ultra_wide_threshold < zoom.telephoto_threshold);
    assert!(zoom.switch_hysteresis >= 0.0);
}

#[test]
fn test_render_tiers_shrink() {
    let render = Config::default().render;
    assert!(render.thumbnail_max_dimension < render.preview_max_dimension);
    assert!(render.thumbnail_quality <= render.preview_quality);
    assert!(render.preview_quality <= render.full_quality);
}

#[test]
fn test_focus_timing_defaults() {
    let focus = Config::default().focus;
    assert_eq!(focus.auto_revert(), Duration::from_secs(3));
    assert_eq!(focus.long_press(), Duration::from_secs(2));
}

#[test]
fn test_config_roundtrip_through_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.store_location = false;
    config.default_lens = LensProfile::Portrait;
    config.zoom.telephoto_threshold = 3.0;
    config.save_to(&path).expect("save");

    let loaded = Config::load_from(&path).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let loaded = Config::load_from(&dir.path().join("absent.json")).expect("load");
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").expect("write");
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_explicit_capture_dir_wins() {
    let mut config = Config::default();
    config.capture_dir = Some("/tmp/shots".into());
    assert_eq!(config.resolved_capture_dir(), std::path::PathBuf::from("/tmp/shots"));
}

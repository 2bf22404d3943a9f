// SPDX-License-Identifier: MPL-2.0

//! Integration tests for zoom-to-module mapping

use mobile_camera::backends::camera::{CameraType, ZoomMapper, ZoomTarget};
use mobile_camera::config::ZoomConfig;

fn full_mapper() -> ZoomMapper {
    ZoomMapper::new(ZoomConfig::default(), true, Some(3.0))
}

#[test]
fn test_half_zoom_uses_ultra_wide_natively() {
    assert_eq!(
        full_mapper().map(0.5),
        ZoomTarget::new(CameraType::UltraWide, 1.0)
    );
}

#[test]
fn test_below_one_is_always_ultra_wide() {
    let mapper = full_mapper();
    for factor in [0.0, 0.1, 0.5, 0.75, 0.99] {
        assert_eq!(
            mapper.map(factor),
            ZoomTarget::new(CameraType::UltraWide, 1.0),
            "factor {}",
            factor
        );
    }
}

#[test]
fn test_two_without_telephoto_stays_wide() {
    let mapper = ZoomMapper::new(ZoomConfig::default(), true, None);
    assert_eq!(mapper.map(2.0), ZoomTarget::new(CameraType::Wide, 2.0));
}

#[test]
fn test_high_zoom_without_telephoto_is_digital_on_wide() {
    let mapper = ZoomMapper::new(ZoomConfig::default(), true, None);
    for factor in [4.0, 5.0, 8.0] {
        assert_eq!(mapper.map(factor), ZoomTarget::new(CameraType::Wide, factor));
    }
}

#[test]
fn test_five_with_telephoto_divides_by_native_factor() {
    let target = full_mapper().map(5.0);
    assert_eq!(target.camera_type, CameraType::Telephoto);
    assert!((target.ratio - 5.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_without_ultra_wide_sub_one_stays_on_wide() {
    let mapper = ZoomMapper::new(ZoomConfig::default(), false, Some(3.0));
    assert_eq!(mapper.map(0.5).camera_type, CameraType::Wide);
}

#[test]
fn test_hysteresis_holds_telephoto_just_below_threshold() {
    let mapper = full_mapper();
    assert_eq!(
        mapper.map_from(CameraType::Telephoto, 3.97).camera_type,
        CameraType::Telephoto
    );
    assert_eq!(
        mapper.map_from(CameraType::Telephoto, 3.9).camera_type,
        CameraType::Wide
    );
    assert_eq!(
        mapper.map_from(CameraType::Wide, 4.0).camera_type,
        CameraType::Telephoto
    );
}

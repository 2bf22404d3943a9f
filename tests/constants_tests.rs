// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use mobile_camera::constants::{
    FilterLut, LensProfile, ManualControl, ShutterSpeed, WhiteBalancePreset,
};
use std::time::Duration;

#[test]
fn test_lens_presets_ordered_by_zoom() {
    let mut prev = 0.0;
    for lens in LensProfile::ALL {
        assert!(
            lens.zoom_factor() > prev,
            "Presets should be ordered from widest to longest"
        );
        prev = lens.zoom_factor();
    }
}

#[test]
fn test_lens_labels() {
    assert_eq!(LensProfile::UltraWide.label(), "13mm");
    assert_eq!(LensProfile::Telephoto.label(), "100mm");
}

#[test]
fn test_shutter_table_fastest_first() {
    assert_eq!(ShutterSpeed::ALL.len(), 13);
    for pair in ShutterSpeed::ALL.windows(2) {
        assert!(pair[0].duration() < pair[1].duration());
    }
}

#[test]
fn test_shutter_display_strings() {
    assert_eq!(ShutterSpeed::OneOver4000.display_string(), "1/4000");
    assert_eq!(ShutterSpeed::One.display_string(), "1\"");
}

#[test]
fn test_nearest_shutter() {
    assert_eq!(
        ShutterSpeed::nearest(Duration::from_micros(8333)),
        ShutterSpeed::OneOver125
    );
    assert_eq!(
        ShutterSpeed::nearest(Duration::from_secs(5)),
        ShutterSpeed::One
    );
    assert_eq!(
        ShutterSpeed::nearest(Duration::from_nanos(1)),
        ShutterSpeed::OneOver4000
    );
}

#[test]
fn test_white_balance_presets() {
    assert_eq!(WhiteBalancePreset::Auto.temperature(), None);
    let (min, max) = ManualControl::Temperature.range();
    for preset in WhiteBalancePreset::ALL {
        if let Some(kelvin) = preset.temperature() {
            assert!(kelvin >= min && kelvin <= max, "{:?} out of range", preset);
        }
    }
}

#[test]
fn test_filter_display_names() {
    for filter in FilterLut::ALL {
        assert!(
            !filter.display_name().is_empty(),
            "Filter {:?} has empty display name",
            filter
        );
    }
}

#[test]
fn test_manual_control_defaults_within_range() {
    for control in ManualControl::ALL {
        let (min, max) = control.range();
        let value = control.default_value();
        assert!(value >= min && value <= max, "{:?} default out of range", control);
        assert_eq!(control.snap(value), value);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Decode and orientation correction
//!
//! The orientation snapshot is baked into the pixels once here. Every tier
//! produced afterwards is already upright, so nothing downstream needs to
//! carry orientation metadata.

use crate::backends::motion::DeviceOrientation;
use crate::errors::RenderError;
use image::RgbImage;
use tracing::debug;

/// Decoded, upright capture
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub image: RgbImage,
    pub width: u32,
    pub height: u32,
}

impl ProcessedImage {
    fn new(image: RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            image,
        }
    }
}

/// Decode encoded sensor output into RGB
///
/// # Errors
/// [`RenderError::InvalidPhotoData`] for empty or undecodable input.
pub fn decode(data: &[u8]) -> Result<RgbImage, RenderError> {
    if data.is_empty() {
        return Err(RenderError::InvalidPhotoData("empty capture buffer".to_string()));
    }

    let image = image::load_from_memory(data)
        .map_err(|e| RenderError::InvalidPhotoData(e.to_string()))?
        .to_rgb8();

    if image.width() == 0 || image.height() == 0 {
        return Err(RenderError::InvalidPhotoData("zero-sized image".to_string()));
    }

    debug!(width = image.width(), height = image.height(), "Decoded capture");
    Ok(image)
}

/// Rotate a sensor frame so it is upright for `orientation`
pub fn apply_orientation(image: RgbImage, orientation: DeviceOrientation) -> RgbImage {
    match orientation.rotation_degrees() {
        90 => image::imageops::rotate90(&image),
        180 => image::imageops::rotate180(&image),
        270 => image::imageops::rotate270(&image),
        _ => image,
    }
}

/// Decode and bake orientation in one step
pub fn process(data: &[u8], orientation: DeviceOrientation) -> Result<ProcessedImage, RenderError> {
    let decoded = decode(data)?;
    let upright = apply_orientation(decoded, orientation);
    debug!(
        %orientation,
        width = upright.width(),
        height = upright.height(),
        "Orientation applied"
    );
    Ok(ProcessedImage::new(upright))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn marked_frame() -> RgbImage {
        // 4x2 landscape frame with a red top-left pixel
        let mut image = RgbImage::from_pixel(4, 2, Rgb([0, 0, 0]));
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image
    }

    #[test]
    fn test_portrait_rotates_clockwise() {
        let rotated = apply_orientation(marked_frame(), DeviceOrientation::Portrait);
        assert_eq!(rotated.dimensions(), (2, 4));
        // Top-left moves to top-right after a clockwise quarter turn
        assert_eq!(rotated.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_landscape_left_is_untouched() {
        let image = apply_orientation(marked_frame(), DeviceOrientation::LandscapeLeft);
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(image.get_pixel(0, 0), &Rgb([255, 0, 0]));

        let flipped = apply_orientation(marked_frame(), DeviceOrientation::LandscapeRight);
        assert_eq!(flipped.get_pixel(3, 1), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_invalid_data() {
        assert!(matches!(decode(&[]), Err(RenderError::InvalidPhotoData(_))));
        assert!(matches!(
            decode(b"definitely not a jpeg"),
            Err(RenderError::InvalidPhotoData(_))
        ));
    }
}

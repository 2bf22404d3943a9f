// SPDX-License-Identifier: GPL-3.0-only

//! Tiered JPEG rendering
//!
//! One upright image becomes three encodings:
//! - Full: original resolution
//! - Preview: long edge bounded (1600px by default)
//! - Thumbnail: long edge bounded (512px by default)
//!
//! Each tier has its own quality. A smaller tier never ends up with more
//! bytes or more pixels than the tier above it.

use super::processing::{self, ProcessedImage};
use crate::backends::motion::DeviceOrientation;
use crate::config::RenderConfig;
use crate::errors::RenderError;
use image::imageops::FilterType;
use image::{ExtendedColorType, RgbImage};
use std::io::Cursor;
use tracing::{debug, info};

/// Quality drop per retry when a tier outgrows the one above it
const QUALITY_STEP: u8 = 10;
const MIN_QUALITY: u8 = 10;

/// Output resolution tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTier {
    Full,
    Preview,
    Thumbnail,
}

impl RenderTier {
    pub const ALL: [RenderTier; 3] = [RenderTier::Full, RenderTier::Preview, RenderTier::Thumbnail];

    /// Long-edge bound in pixels, None for unbounded
    pub fn max_dimension(&self, config: &RenderConfig) -> Option<u32> {
        match self {
            RenderTier::Full => None,
            RenderTier::Preview => Some(config.preview_max_dimension),
            RenderTier::Thumbnail => Some(config.thumbnail_max_dimension),
        }
    }

    /// JPEG quality (1-100)
    pub fn quality(&self, config: &RenderConfig) -> u8 {
        let quality = match self {
            RenderTier::Full => config.full_quality,
            RenderTier::Preview => config.preview_quality,
            RenderTier::Thumbnail => config.thumbnail_quality,
        };
        quality.clamp(1, 100)
    }
}

impl std::fmt::Display for RenderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderTier::Full => write!(f, "full"),
            RenderTier::Preview => write!(f, "preview"),
            RenderTier::Thumbnail => write!(f, "thumbnail"),
        }
    }
}

/// Encoded image data ready for saving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// The three encodings of one capture
#[derive(Debug, Clone)]
pub struct RenderedPhotoBundle {
    pub original: EncodedImage,
    pub preview: EncodedImage,
    pub thumbnail: EncodedImage,
}

impl RenderedPhotoBundle {
    pub fn tier(&self, tier: RenderTier) -> &EncodedImage {
        match tier {
            RenderTier::Full => &self.original,
            RenderTier::Preview => &self.preview,
            RenderTier::Thumbnail => &self.thumbnail,
        }
    }
}

/// Size that fits inside `max` on the long edge, keeping aspect ratio
///
/// Never upscales.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let long = width.max(height);
    if max == 0 || long <= max {
        return (width, height);
    }

    let scale = max as f64 / long as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    if width >= height {
        (max, scaled(height))
    } else {
        (scaled(width), max)
    }
}

/// Encode RGB pixels as JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);

    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100))
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| RenderError::RenderingFailure(format!("JPEG encoding failed: {}", e)))?;

    Ok(buffer)
}

/// Renders captures into [`RenderedPhotoBundle`]s
#[derive(Debug, Clone, Default)]
pub struct PhotoRenderer {
    config: RenderConfig,
}

impl PhotoRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render on the blocking thread pool
    ///
    /// Decoding, resizing and encoding are CPU-bound; running them off the
    /// async workers keeps the session responsive.
    pub async fn render(
        &self,
        data: Vec<u8>,
        orientation: DeviceOrientation,
    ) -> Result<RenderedPhotoBundle, RenderError> {
        let renderer = self.clone();
        tokio::task::spawn_blocking(move || renderer.render_blocking(&data, orientation))
            .await
            .map_err(|e| RenderError::RenderingFailure(format!("render task: {}", e)))?
    }

    /// Render on the calling thread
    pub fn render_blocking(
        &self,
        data: &[u8],
        orientation: DeviceOrientation,
    ) -> Result<RenderedPhotoBundle, RenderError> {
        let processed = processing::process(data, orientation)?;
        self.render_processed(processed)
    }

    /// Encode all three tiers of an upright image
    pub fn render_processed(
        &self,
        processed: ProcessedImage,
    ) -> Result<RenderedPhotoBundle, RenderError> {
        let full = processed.image;
        let original = self.encode_tier(&full, RenderTier::Full, None)?;

        let preview_image = self.downscale(&full, RenderTier::Preview);
        let preview = self.encode_tier(
            preview_image.as_ref().unwrap_or(&full),
            RenderTier::Preview,
            Some(&original),
        )?;

        let preview_source = preview_image.as_ref().unwrap_or(&full);
        let thumbnail_image = self.downscale(preview_source, RenderTier::Thumbnail);
        let thumbnail = self.encode_tier(
            thumbnail_image.as_ref().unwrap_or(preview_source),
            RenderTier::Thumbnail,
            Some(&preview),
        )?;

        info!(
            width = original.width,
            height = original.height,
            original_bytes = original.data.len(),
            preview_bytes = preview.data.len(),
            thumbnail_bytes = thumbnail.data.len(),
            "Rendered photo bundle"
        );

        Ok(RenderedPhotoBundle {
            original,
            preview,
            thumbnail,
        })
    }

    /// Resized copy for a tier, None if the source already fits
    fn downscale(&self, source: &RgbImage, tier: RenderTier) -> Option<RgbImage> {
        let max = tier.max_dimension(&self.config)?;
        let (width, height) = fit_within(source.width(), source.height(), max);
        if (width, height) == source.dimensions() {
            return None;
        }

        debug!(%tier, width, height, "Resizing");
        let resized = match tier {
            RenderTier::Thumbnail => image::imageops::thumbnail(source, width, height),
            _ => image::imageops::resize(source, width, height, FilterType::Triangle),
        };
        Some(resized)
    }

    /// Encode a tier, never exceeding the byte size of the tier above
    fn encode_tier(
        &self,
        image: &RgbImage,
        tier: RenderTier,
        above: Option<&EncodedImage>,
    ) -> Result<EncodedImage, RenderError> {
        let mut quality = tier.quality(&self.config);
        let mut data = encode_jpeg(image, quality)?;

        if let Some(above) = above {
            let same_size = (above.width, above.height) == image.dimensions();
            if same_size && data.len() > above.data.len() {
                // Identical pixels at a different quality; the larger tier's bytes serve both
                data = above.data.clone();
            }
            while data.len() > above.data.len() && quality > MIN_QUALITY {
                quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
                debug!(%tier, quality, "Tier larger than the one above, re-encoding");
                data = encode_jpeg(image, quality)?;
            }
            if data.len() > above.data.len() {
                return Err(RenderError::RenderingFailure(format!(
                    "{} tier is {} bytes, larger than the {} bytes above it at minimum quality",
                    tier,
                    data.len(),
                    above.data.len()
                )));
            }
        }

        debug!(%tier, bytes = data.len(), quality, "Encoded tier");
        Ok(EncodedImage {
            data,
            width: image.width(),
            height: image.height(),
        })
    }
}

// SPDX-License-Identifier: MPL-2.0

//! Async photo processing pipeline
//!
//! ```text
//! RawCapture → Decode → Orient → Encode ×3 → Disk I/O → PhotoAsset
//!                 (blocking pool)              (blocking pool)
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Decode**: Sensor JPEG to RGB
//! 2. **Orient**: Bake the capture-time orientation into the pixels
//! 3. **Encoding**: Full, preview and thumbnail JPEG tiers
//! 4. **Disk I/O**: Temp-write and rename all three files
//!
//! Stages 1-3 are all-or-nothing: a failure never yields a partial bundle.

pub mod encoding;
pub mod processing;

pub use encoding::{
    EncodedImage, PhotoRenderer, RenderTier, RenderedPhotoBundle, encode_jpeg, fit_within,
};
pub use processing::ProcessedImage;

use crate::backends::motion::DeviceOrientation;
use crate::config::RenderConfig;
use crate::errors::AppError;
use crate::storage::{AssetStore, PhotoAsset, PhotoMetadata};
use tracing::info;

/// Render and persist a capture
pub struct PhotoPipeline {
    renderer: PhotoRenderer,
    store: AssetStore,
}

impl PhotoPipeline {
    pub fn new(config: RenderConfig, store: AssetStore) -> Self {
        Self {
            renderer: PhotoRenderer::new(config),
            store,
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Render the three tiers and write them to disk
    ///
    /// # Arguments
    /// * `data` - Encoded sensor output
    /// * `orientation` - Orientation snapshot taken when the shutter was pressed
    /// * `metadata` - Values recorded on the asset
    pub async fn process(
        &self,
        data: Vec<u8>,
        orientation: DeviceOrientation,
        metadata: PhotoMetadata,
    ) -> Result<PhotoAsset, AppError> {
        let bundle = self.renderer.render(data, orientation).await?;
        let asset = self.store.persist(bundle, metadata).await?;
        info!(id = %asset.id, "Photo processed");
        Ok(asset)
    }

    /// Remove an asset's files
    pub async fn discard(&self, asset: &PhotoAsset) -> Result<(), AppError> {
        self.store.delete(asset).await?;
        Ok(())
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Asset persistence
//!
//! Each capture is stored as three JPEG files sharing one id:
//!
//! ```text
//! Captures/
//!   {id}_original.jpg
//!   {id}_preview.jpg
//!   {id}_thumb.jpg
//! ```
//!
//! Files are first written under hidden temporary names and only renamed
//! into place once all three writes succeeded. A failed attempt removes
//! everything it created, so an asset's files either all exist or none do.

use crate::errors::StorageError;
use crate::pipelines::photo::RenderedPhotoBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Role of one file within an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetRole {
    Original,
    Preview,
    Thumbnail,
}

impl AssetRole {
    pub const ALL: [AssetRole; 3] = [AssetRole::Original, AssetRole::Preview, AssetRole::Thumbnail];

    pub fn suffix(&self) -> &'static str {
        match self {
            AssetRole::Original => "original",
            AssetRole::Preview => "preview",
            AssetRole::Thumbnail => "thumb",
        }
    }

    /// File name for this role of asset `id`
    pub fn file_name(&self, id: Uuid) -> String {
        format!("{}_{}.jpg", id, self.suffix())
    }
}

/// Capture metadata recorded on the asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub filter_name: String,
    pub lens_label: String,
    pub iso: u32,
    pub aperture: f64,
    pub shutter_speed: String,
    pub location: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// A stored capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoAsset {
    pub id: Uuid,
    pub original_path: PathBuf,
    pub preview_path: PathBuf,
    pub thumbnail_path: PathBuf,
    pub filter_name: String,
    pub lens_label: String,
    pub iso: u32,
    pub aperture: f64,
    pub shutter_speed: String,
    pub location: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl PhotoAsset {
    pub fn path(&self, role: AssetRole) -> &Path {
        match role {
            AssetRole::Original => &self.original_path,
            AssetRole::Preview => &self.preview_path,
            AssetRole::Thumbnail => &self.thumbnail_path,
        }
    }
}

/// Writes and removes asset files under one capture directory
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: Uuid, role: AssetRole) -> PathBuf {
        self.dir.join(role.file_name(id))
    }

    /// Create the capture directory if needed
    pub fn ensure_dir(&self) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            StorageError::DirectoryCreationFailed(format!("{}: {}", self.dir.display(), e))
        })
    }

    /// Write a bundle under a fresh id, off the async workers
    pub async fn persist(
        &self,
        bundle: RenderedPhotoBundle,
        metadata: PhotoMetadata,
    ) -> Result<PhotoAsset, StorageError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.persist_as(Uuid::new_v4(), bundle, metadata))
            .await
            .map_err(|e| StorageError::FileWriteFailed(format!("write task: {}", e)))?
    }

    /// Write a bundle under a caller-chosen id
    ///
    /// Takes ownership of the bundle; the in-memory copies are dropped once
    /// the files are in place.
    pub fn persist_as(
        &self,
        id: Uuid,
        bundle: RenderedPhotoBundle,
        metadata: PhotoMetadata,
    ) -> Result<PhotoAsset, StorageError> {
        self.ensure_dir()?;

        let files = [
            (AssetRole::Original, &bundle.original.data),
            (AssetRole::Preview, &bundle.preview.data),
            (AssetRole::Thumbnail, &bundle.thumbnail.data),
        ];

        let mut written: Vec<PathBuf> = Vec::with_capacity(files.len());
        for (role, data) in files {
            let temp = self.temp_path(id, role);
            if let Err(e) = std::fs::write(&temp, data) {
                warn!(path = %temp.display(), error = %e, "Asset write failed");
                written.push(temp);
                Self::cleanup(&written);
                return Err(StorageError::FileWriteFailed(format!(
                    "{}: {}",
                    role.file_name(id),
                    e
                )));
            }
            debug!(path = %temp.display(), bytes = data.len(), "Wrote temporary asset file");
            written.push(temp);
        }

        let mut placed: Vec<PathBuf> = Vec::with_capacity(files.len());
        for role in AssetRole::ALL {
            let temp = self.temp_path(id, role);
            let target = self.path_for(id, role);
            if let Err(e) = std::fs::rename(&temp, &target) {
                warn!(path = %target.display(), error = %e, "Asset rename failed");
                Self::cleanup(&placed);
                Self::cleanup(&written);
                return Err(StorageError::FileWriteFailed(format!(
                    "{}: {}",
                    target.display(),
                    e
                )));
            }
            placed.push(target);
        }
        drop(bundle);

        info!(%id, dir = %self.dir.display(), "Asset persisted");
        Ok(PhotoAsset {
            id,
            original_path: self.path_for(id, AssetRole::Original),
            preview_path: self.path_for(id, AssetRole::Preview),
            thumbnail_path: self.path_for(id, AssetRole::Thumbnail),
            filter_name: metadata.filter_name,
            lens_label: metadata.lens_label,
            iso: metadata.iso,
            aperture: metadata.aperture,
            shutter_speed: metadata.shutter_speed,
            location: metadata.location,
            captured_at: metadata.captured_at,
        })
    }

    /// Remove an asset's files, off the async workers
    pub async fn delete(&self, asset: &PhotoAsset) -> Result<(), StorageError> {
        let asset = asset.clone();
        tokio::task::spawn_blocking(move || Self::delete_files(&asset))
            .await
            .map_err(|e| StorageError::FileDeleteFailed(format!("delete task: {}", e)))?
    }

    /// Remove an asset's files
    ///
    /// Files that are already gone count as deleted. Every file is attempted
    /// even if an earlier one fails; the first failure is reported.
    pub fn delete_files(asset: &PhotoAsset) -> Result<(), StorageError> {
        let mut first_error = None;
        for role in AssetRole::ALL {
            let path = asset.path(role);
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Deleted asset file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Asset file already gone");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete asset file");
                    first_error.get_or_insert(StorageError::FileDeleteFailed(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(id = %asset.id, "Asset files deleted");
                Ok(())
            }
        }
    }

    fn temp_path(&self, id: Uuid, role: AssetRole) -> PathBuf {
        self.dir.join(format!(".{}.partial", role.file_name(id)))
    }

    fn cleanup(paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to clean up partial asset");
                }
            }
        }
    }
}

/// Catalog collaborator that records finished assets
pub trait PhotoCatalog: Send + Sync {
    fn insert(&self, asset: &PhotoAsset) -> Result<(), StorageError>;
    fn delete(&self, asset: &PhotoAsset) -> Result<(), StorageError>;
}

/// In-process catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    assets: Mutex<Vec<PhotoAsset>>,
    reject_inserts: Mutex<bool>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first
    pub fn assets(&self) -> Vec<PhotoAsset> {
        let mut assets = lock(&self.assets).clone();
        assets.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        assets
    }

    pub fn len(&self) -> usize {
        lock(&self.assets).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make subsequent inserts fail (simulates a full or locked store)
    pub fn reject_inserts(&self, reject: bool) {
        *lock(&self.reject_inserts) = reject;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PhotoCatalog for MemoryCatalog {
    fn insert(&self, asset: &PhotoAsset) -> Result<(), StorageError> {
        if *lock(&self.reject_inserts) {
            return Err(StorageError::Catalog("catalog is read-only".to_string()));
        }
        lock(&self.assets).push(asset.clone());
        Ok(())
    }

    fn delete(&self, asset: &PhotoAsset) -> Result<(), StorageError> {
        lock(&self.assets).retain(|a| a.id != asset.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::photo::EncodedImage;

    fn bundle() -> RenderedPhotoBundle {
        let image = |n: usize, side: u32| EncodedImage {
            data: vec![0xAB; n],
            width: side,
            height: side,
        };
        RenderedPhotoBundle {
            original: image(300, 30),
            preview: image(200, 20),
            thumbnail: image(100, 10),
        }
    }

    fn metadata() -> PhotoMetadata {
        PhotoMetadata {
            filter_name: "None".to_string(),
            lens_label: "35mm".to_string(),
            iso: 100,
            aperture: 1.8,
            shutter_speed: "1/125".to_string(),
            location: None,
            captured_at: Utc::now(),
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_persist_writes_three_files_with_shared_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = AssetStore::new(temp.path().join("Captures"));
        let id = Uuid::new_v4();

        let asset = store.persist_as(id, bundle(), metadata()).expect("persist");
        assert_eq!(
            file_names(store.dir()),
            vec![
                format!("{}_original.jpg", id),
                format!("{}_preview.jpg", id),
                format!("{}_thumb.jpg", id),
            ]
        );
        assert_eq!(std::fs::read(&asset.thumbnail_path).expect("read").len(), 100);
        assert_eq!(asset.lens_label, "35mm");
    }

    #[test]
    fn test_failed_write_leaves_no_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = AssetStore::new(temp.path());
        let id = Uuid::new_v4();
        // A directory squatting on the thumbnail name makes the final rename fail
        let blocker = store.path_for(id, AssetRole::Thumbnail);
        std::fs::create_dir(&blocker).expect("blocker");

        let err = store.persist_as(id, bundle(), metadata()).unwrap_err();
        assert!(matches!(err, StorageError::FileWriteFailed(_)));
        assert_eq!(file_names(temp.path()), vec![format!("{}_thumb.jpg", id)]);
    }

    #[test]
    fn test_unwritable_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, b"x").expect("write");
        let store = AssetStore::new(file.join("Captures"));
        let err = store.persist_as(Uuid::new_v4(), bundle(), metadata()).unwrap_err();
        assert!(matches!(err, StorageError::DirectoryCreationFailed(_)));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = AssetStore::new(temp.path());
        let asset = store
            .persist_as(Uuid::new_v4(), bundle(), metadata())
            .expect("persist");

        std::fs::remove_file(&asset.preview_path).expect("manual removal");
        AssetStore::delete_files(&asset).expect("first delete");
        AssetStore::delete_files(&asset).expect("second delete");
        assert!(file_names(temp.path()).is_empty());
    }

    #[test]
    fn test_memory_catalog() {
        let catalog = MemoryCatalog::new();
        let temp = tempfile::tempdir().expect("tempdir");
        let asset = AssetStore::new(temp.path())
            .persist_as(Uuid::new_v4(), bundle(), metadata())
            .expect("persist");

        catalog.insert(&asset).expect("insert");
        assert_eq!(catalog.len(), 1);
        catalog.reject_inserts(true);
        assert!(matches!(catalog.insert(&asset), Err(StorageError::Catalog(_))));
        catalog.delete(&asset).expect("delete");
        assert!(catalog.is_empty());
    }
}

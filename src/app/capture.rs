// SPDX-License-Identifier: GPL-3.0-only

//! Capture workflow orchestration
//!
//! Sequences one capture through the session, the photo pipeline and the
//! catalog, publishing [`CaptureState`] as it goes. Only one capture runs
//! at a time; a second request while busy is rejected without touching the
//! one in flight.

use super::state::CaptureState;
use crate::constants::{FilterLut, ShutterSpeed};
use crate::errors::{AppError, CameraError};
use crate::flash::FlashMode;
use crate::pipelines::photo::PhotoPipeline;
use crate::session::{CapturedPhoto, SessionHandle};
use crate::storage::{PhotoAsset, PhotoCatalog, PhotoMetadata};
use chrono::{DateTime, Utc};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Per-capture selections from the presentation layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaptureOptions {
    pub flash: FlashMode,
    pub filter: FilterLut,
    pub lens_label: String,
    /// Location snapshot; None omits the field
    pub location: Option<String>,
}

/// Capture → process → persist orchestrator
#[derive(Clone)]
pub struct CaptureWorkflow {
    session: Option<SessionHandle>,
    pipeline: Arc<PhotoPipeline>,
    catalog: Arc<dyn PhotoCatalog>,
    state_tx: Arc<watch::Sender<CaptureState>>,
}

impl CaptureWorkflow {
    /// Create a workflow; without a session every capture fails
    pub fn new(
        session: Option<SessionHandle>,
        pipeline: Arc<PhotoPipeline>,
        catalog: Arc<dyn PhotoCatalog>,
    ) -> Self {
        let (state_tx, _) = watch::channel(CaptureState::Idle);
        Self {
            session,
            pipeline,
            catalog,
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CaptureState> {
        self.state_tx.subscribe()
    }

    /// Stream of state changes
    pub fn states(&self) -> impl Stream<Item = CaptureState> + Send + 'static {
        let mut rx = self.state_tx.subscribe();
        async_stream::stream! {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                yield state;
            }
        }
    }

    /// Back to idle after the presentation layer has shown the result
    ///
    /// Ignored while a capture is in flight.
    pub fn reset(&self) {
        self.state_tx.send_if_modified(|state| {
            if state.is_busy() || *state == CaptureState::Idle {
                false
            } else {
                *state = CaptureState::Idle;
                true
            }
        });
    }

    /// Start a capture and return a handle to its outcome
    ///
    /// The hardware request, including its orientation snapshot, is issued
    /// before this returns.
    ///
    /// # Errors
    /// [`CameraError::CaptureInProgress`] while another capture is capturing
    /// or processing; [`CameraError::CaptureFailed`] without a camera.
    pub fn start(
        &self,
        options: CaptureOptions,
    ) -> Result<JoinHandle<Result<PhotoAsset, AppError>>, CameraError> {
        let mut previous = CaptureState::Idle;
        let accepted = self.state_tx.send_if_modified(|state| {
            if state.is_busy() {
                false
            } else {
                previous = std::mem::replace(state, CaptureState::Capturing);
                true
            }
        });
        if !accepted {
            warn!("Capture rejected, another capture is in flight");
            return Err(CameraError::CaptureInProgress);
        }

        let Some(session) = &self.session else {
            let err = CameraError::CaptureFailed(CameraError::NoCameraFound.to_string());
            self.fail(&err.to_string());
            return Err(err);
        };

        let captured_at = Utc::now();
        let pending = match session.capture(options.flash) {
            Ok(pending) => pending,
            Err(CameraError::CaptureInProgress) => {
                self.state_tx.send_replace(previous);
                return Err(CameraError::CaptureInProgress);
            }
            Err(e) => {
                self.fail(&e.to_string());
                return Err(e);
            }
        };

        let workflow = self.clone();
        Ok(tokio::spawn(async move {
            let result = match pending.await {
                Ok(photo) => workflow.finish(photo, options, captured_at).await,
                Err(e) => Err(AppError::from(e)),
            };

            match &result {
                Ok(asset) => {
                    info!(id = %asset.id, "Capture saved");
                    workflow.state_tx.send_replace(CaptureState::Saved);
                }
                Err(e) => workflow.fail(&e.to_string()),
            }
            result
        }))
    }

    /// Capture and wait for the stored asset
    pub async fn capture(&self, options: CaptureOptions) -> Result<PhotoAsset, AppError> {
        let handle = self.start(options)?;
        handle
            .await
            .map_err(|e| AppError::Other(format!("capture task: {}", e)))?
    }

    /// Processing phase: render, write files, then record in the catalog
    async fn finish(
        &self,
        photo: CapturedPhoto,
        options: CaptureOptions,
        captured_at: DateTime<Utc>,
    ) -> Result<PhotoAsset, AppError> {
        self.state_tx.send_replace(CaptureState::Processing);

        let CapturedPhoto { request, raw } = photo;
        let metadata = PhotoMetadata {
            filter_name: options.filter.display_name().to_string(),
            lens_label: options.lens_label,
            iso: raw.iso.round().max(0.0) as u32,
            aperture: request.device.aperture,
            shutter_speed: ShutterSpeed::nearest(raw.exposure_duration).display_string(),
            location: options.location,
            captured_at,
        };

        let asset = self
            .pipeline
            .process(raw.data, request.orientation, metadata)
            .await?;

        if let Err(e) = self.catalog.insert(&asset) {
            error!(id = %asset.id, error = %e, "Catalog insert failed, removing files");
            if let Err(cleanup) = self.pipeline.discard(&asset).await {
                warn!(id = %asset.id, error = %cleanup, "Failed to remove orphaned files");
            }
            return Err(e.into());
        }
        Ok(asset)
    }

    fn fail(&self, message: &str) {
        warn!(reason = message, "Capture failed");
        self.state_tx
            .send_replace(CaptureState::Failure(message.to_string()));
    }
}

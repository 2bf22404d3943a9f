// SPDX-License-Identifier: GPL-3.0-only

//! Presentation-facing camera controller
//!
//! [`CameraController`] wires the orientation sampler, the capture session,
//! the focus state machine and the capture workflow together, and exposes
//! the commands and observable values a user interface binds to.
//!
//! ```text
//! UI ──commands──► CameraController ──► SessionHandle ──► camera-session thread
//!  ▲                    │    │
//!  │                    │    └──► FocusController (timers)
//!  │                    └───────► CaptureWorkflow ──► PhotoPipeline ──► catalog
//!  └──── watch: controls, capture state, focus state, orientation, level
//! ```
//!
//! Without camera hardware the controller starts in a disabled mode: zoom
//! and lens commands return [`CameraError::NoCameraFound`], captures fail,
//! and everything else is a no-op.

pub mod capture;
pub mod state;

pub use capture::{CaptureOptions, CaptureWorkflow};
pub use state::{CaptureState, ControlState};

use crate::backends::camera::{
    CameraBackend, CameraDevice, ControlRange, DeviceCapabilities, NormalizedPoint,
};
use crate::backends::motion::{DeviceOrientation, LevelReading, MotionSource, OrientationSampler};
use crate::config::Config;
use crate::constants::{FilterLut, LensProfile, ShutterSpeed, WhiteBalancePreset};
use crate::errors::{AppError, CameraError};
use crate::flash::FlashMode;
use crate::pipelines::photo::PhotoPipeline;
use crate::session::{
    CaptureSession, FocusController, FocusExposureState, SessionHandle, SessionSnapshot,
    SettingOutcome, ViewPoint,
};
use crate::storage::{AssetStore, PhotoAsset, PhotoCatalog};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct CameraController {
    config: Config,
    session: Option<SessionHandle>,
    focus: Option<FocusController<SessionHandle>>,
    sampler: OrientationSampler,
    workflow: CaptureWorkflow,
    pipeline: Arc<PhotoPipeline>,
    catalog: Arc<dyn PhotoCatalog>,
    controls_tx: watch::Sender<ControlState>,
}

impl CameraController {
    /// Start sampling, open the session and select the configured lens
    ///
    /// A backend without devices, or one that cannot bind any of them,
    /// leaves the controller disabled instead of failing.
    pub async fn start(
        config: Config,
        backend: Box<dyn CameraBackend>,
        motion: Box<dyn MotionSource>,
        catalog: Arc<dyn PhotoCatalog>,
    ) -> Self {
        let sampler = OrientationSampler::start(motion, &config.orientation);

        let session = match CaptureSession::start(backend, config.zoom.clone(), sampler.subscribe())
        {
            Ok(session) => Some(session),
            Err(e) => {
                error!(error = %e, "Camera unavailable, capture disabled");
                None
            }
        };

        let focus = session.as_ref().map(|session| {
            let range = bias_range(&session.snapshot());
            FocusController::new(session.clone(), &config.focus, range)
        });

        let store = AssetStore::new(config.resolved_capture_dir());
        let pipeline = Arc::new(PhotoPipeline::new(config.render.clone(), store));
        let workflow = CaptureWorkflow::new(session.clone(), Arc::clone(&pipeline), Arc::clone(&catalog));

        let (controls_tx, _) = watch::channel(ControlState::new(
            config.default_lens,
            config.store_location,
        ));

        let controller = Self {
            config,
            session,
            focus,
            sampler,
            workflow,
            pipeline,
            catalog,
            controls_tx,
        };

        let lens = controller.config.default_lens;
        if controller.session.is_some() {
            if let Err(e) = controller.set_lens_preset(lens).await {
                warn!(lens = %lens.label(), error = %e, "Default lens unavailable, staying on wide");
            }
        }
        controller
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether camera hardware is available
    pub fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    pub fn devices(&self) -> &[CameraDevice] {
        match &self.session {
            Some(session) => session.available(),
            None => &[],
        }
    }

    // ===== Observables =====

    pub fn controls(&self) -> ControlState {
        self.controls_tx.borrow().clone()
    }

    pub fn subscribe_controls(&self) -> watch::Receiver<ControlState> {
        self.controls_tx.subscribe()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.workflow.state()
    }

    pub fn subscribe_capture_state(&self) -> watch::Receiver<CaptureState> {
        self.workflow.subscribe()
    }

    pub fn capture_states(&self) -> impl Stream<Item = CaptureState> + Send + 'static {
        self.workflow.states()
    }

    /// Session state; None in disabled mode
    pub fn session_snapshot(&self) -> Option<SessionSnapshot> {
        self.session.as_ref().map(SessionHandle::snapshot)
    }

    pub fn subscribe_session(&self) -> Option<watch::Receiver<SessionSnapshot>> {
        self.session.as_ref().map(SessionHandle::subscribe)
    }

    pub fn focus_state(&self) -> FocusExposureState {
        self.focus
            .as_ref()
            .map_or(FocusExposureState::Idle, FocusController::state)
    }

    pub fn subscribe_focus(&self) -> Option<watch::Receiver<FocusExposureState>> {
        self.focus.as_ref().map(FocusController::subscribe)
    }

    pub fn orientation(&self) -> DeviceOrientation {
        self.sampler.current()
    }

    pub fn subscribe_orientation(&self) -> watch::Receiver<DeviceOrientation> {
        self.sampler.subscribe()
    }

    pub fn orientation_changes(&self) -> impl Stream<Item = DeviceOrientation> + Send + 'static {
        self.sampler.changes()
    }

    pub fn subscribe_level(&self) -> watch::Receiver<LevelReading> {
        self.sampler.level()
    }

    // ===== Zoom and lenses =====

    /// Free zoom; clears the lens preset selection
    pub async fn zoom(&self, factor: f64) -> Result<(), CameraError> {
        let session = self.session()?;
        let result = session.set_zoom(factor, true).await;
        self.sync_from_session(session, |controls| {
            if result.is_ok() && !controls.macro_mode {
                controls.lens = None;
            }
        });
        result.map(|_| ())
    }

    pub async fn set_lens_preset(&self, lens: LensProfile) -> Result<(), CameraError> {
        let session = self.session()?;
        let result = session.select_lens(lens).await;
        self.sync_from_session(session, |controls| {
            if result.is_ok() {
                controls.lens = Some(lens);
            }
        });
        result.map(|_| ())
    }

    pub async fn toggle_macro(&self) -> Result<(), CameraError> {
        let session = self.session()?;
        let enabled = !session.snapshot().macro_mode;
        let result = session.set_macro(enabled).await;
        self.sync_from_session(session, |_| {});
        info!(enabled, "Macro mode toggled");
        result.map(|_| ())
    }

    // ===== Manual controls =====

    /// Exposure compensation in EV, or None for auto
    pub async fn set_exposure(&self, ev: Option<f64>) -> SettingOutcome {
        let Some(session) = &self.session else {
            return SettingOutcome::Unsupported;
        };
        match ev {
            Some(ev) => session.set_exposure_bias(ev).await,
            None => session.set_auto_exposure_bias().await,
        }
    }

    pub async fn set_iso(&self, iso: Option<f64>) -> SettingOutcome {
        let Some(session) = &self.session else {
            return SettingOutcome::Unsupported;
        };
        match iso {
            Some(iso) => session.set_iso(iso).await,
            None => session.set_auto_iso().await,
        }
    }

    pub async fn set_shutter(&self, speed: Option<ShutterSpeed>) -> SettingOutcome {
        let Some(session) = &self.session else {
            return SettingOutcome::Unsupported;
        };
        let outcome = match speed {
            Some(speed) => session.set_shutter(speed.duration()).await,
            None => session.set_auto_shutter().await,
        };
        self.controls_tx.send_modify(|controls| {
            controls.shutter = match outcome {
                SettingOutcome::Applied(_) => speed,
                SettingOutcome::Auto | SettingOutcome::Unsupported => None,
                SettingOutcome::Failed => controls.shutter,
            };
        });
        outcome
    }

    /// White balance in Kelvin, or None for auto; clears any preset
    pub async fn set_white_balance(&self, kelvin: Option<f64>) -> SettingOutcome {
        let Some(session) = &self.session else {
            return SettingOutcome::Unsupported;
        };
        let outcome = match kelvin {
            Some(kelvin) => session.set_white_balance(kelvin).await,
            None => session.set_auto_white_balance().await,
        };
        if outcome != SettingOutcome::Failed {
            self.controls_tx
                .send_modify(|controls| controls.white_balance_preset = None);
        }
        outcome
    }

    pub async fn set_white_balance_preset(&self, preset: WhiteBalancePreset) -> SettingOutcome {
        let outcome = self.set_white_balance(preset.temperature()).await;
        if outcome != SettingOutcome::Failed {
            self.controls_tx.send_modify(|controls| {
                controls.white_balance_preset = Some(preset);
            });
        }
        outcome
    }

    // ===== Focus and exposure =====

    /// Tap on the preview
    pub fn focus_at(&self, point: NormalizedPoint) {
        if let Some(focus) = &self.focus {
            focus.tap(point);
        }
    }

    /// Touch down on the preview; held long enough it locks
    pub fn press_began(&self, position: ViewPoint, point: NormalizedPoint) {
        if let Some(focus) = &self.focus {
            focus.press_began(position, point);
        }
    }

    pub fn press_moved(&self, position: ViewPoint) {
        if let Some(focus) = &self.focus {
            focus.press_moved(position);
        }
    }

    pub fn press_ended(&self) {
        if let Some(focus) = &self.focus {
            focus.press_ended();
        }
    }

    pub fn begin_exposure_drag(&self) {
        if let Some(focus) = &self.focus {
            focus.begin_drag();
        }
    }

    /// Live exposure bias while dragging the focus indicator's slider
    pub fn drag_exposure(&self, ev: f64) {
        if let Some(focus) = &self.focus {
            focus.drag(ev);
        }
    }

    pub fn end_exposure_drag(&self) {
        if let Some(focus) = &self.focus {
            focus.end_drag();
        }
    }

    pub fn lock(&self) {
        if let Some(focus) = &self.focus {
            focus.lock();
        }
    }

    pub fn unlock(&self) {
        if let Some(focus) = &self.focus {
            focus.unlock();
        }
    }

    /// Tap away from the focus indicator
    pub fn dismiss_focus(&self) {
        if let Some(focus) = &self.focus {
            focus.dismiss();
        }
    }

    // ===== Capture options =====

    pub fn set_flash(&self, flash: FlashMode) {
        self.controls_tx.send_modify(|controls| controls.flash = flash);
    }

    pub fn toggle_flash(&self) {
        self.controls_tx
            .send_modify(|controls| controls.flash = controls.flash.toggle());
    }

    pub fn cycle_flash(&self) {
        self.controls_tx
            .send_modify(|controls| controls.flash = controls.flash.next());
    }

    pub fn select_filter(&self, filter: FilterLut) {
        self.controls_tx
            .send_modify(|controls| controls.filter = filter);
    }

    pub fn set_store_location(&self, enabled: bool) {
        self.controls_tx
            .send_modify(|controls| controls.store_location = enabled);
    }

    // ===== Capture =====

    /// Start a capture with the current selections
    ///
    /// `location` is recorded only while location storage is enabled.
    pub fn start_capture(
        &self,
        location: Option<String>,
    ) -> Result<JoinHandle<Result<PhotoAsset, AppError>>, CameraError> {
        self.workflow.start(self.capture_options(location))
    }

    /// Capture and wait for the stored asset
    pub async fn capture(&self, location: Option<String>) -> Result<PhotoAsset, AppError> {
        self.workflow.capture(self.capture_options(location)).await
    }

    /// Return to idle after a saved or failed capture
    pub fn reset_capture_state(&self) {
        self.workflow.reset();
    }

    /// Remove an asset's files, then its catalog record
    pub async fn delete_asset(&self, asset: &PhotoAsset) -> Result<(), AppError> {
        self.pipeline.discard(asset).await?;
        self.catalog.delete(asset)?;
        info!(id = %asset.id, "Asset deleted");
        Ok(())
    }

    /// Stop sampling and release the camera
    pub fn shutdown(&mut self) {
        self.sampler.stop();
        if let Some(session) = &self.session {
            session.shutdown();
        }
    }

    fn capture_options(&self, location: Option<String>) -> CaptureOptions {
        let controls = self.controls_tx.borrow();
        CaptureOptions {
            flash: controls.flash,
            filter: controls.filter,
            lens_label: controls.lens_label(),
            location: location.filter(|_| controls.store_location),
        }
    }

    fn session(&self) -> Result<&SessionHandle, CameraError> {
        self.session.as_ref().ok_or(CameraError::NoCameraFound)
    }

    /// Mirror the session's zoom state into the controls and refresh the
    /// focus bias range for whichever device is now bound
    fn sync_from_session(&self, session: &SessionHandle, update: impl FnOnce(&mut ControlState)) {
        let snapshot = session.snapshot();
        if let Some(focus) = &self.focus {
            focus.set_bias_range(bias_range(&snapshot));
            if !snapshot.focus_locked && focus.state().is_locked() {
                focus.lock_lost();
            }
        }
        self.controls_tx.send_modify(|controls| {
            controls.zoom_factor = snapshot.zoom_factor;
            controls.macro_mode = snapshot.macro_mode;
            update(controls);
        });
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn bias_range(snapshot: &SessionSnapshot) -> ControlRange {
    snapshot
        .device
        .as_ref()
        .map_or_else(
            || DeviceCapabilities::default().exposure_bias,
            |d| d.capabilities.exposure_bias,
        )
}

// SPDX-License-Identifier: MPL-2.0

//! Capture session
//!
//! The session owns the camera hardware. Every configuration change and
//! capture runs on one dedicated worker thread, in the order it was issued:
//!
//! ```text
//! SessionHandle ──mpsc──► camera-session thread ──► DeviceSelector ──► CameraBackend
//!      ▲                         │
//!      └──── oneshot reply ──────┤
//!      └──── watch<SessionSnapshot>
//! ```
//!
//! Only one capture may be outstanding. A second `capture()` is rejected
//! synchronously with [`CameraError::CaptureInProgress`] rather than queued.

pub mod focus;
mod worker;

pub use focus::{
    FocusActuator, FocusController, FocusEffect, FocusExposureState, FocusMachine,
    LongPressTracker, ViewPoint,
};

use crate::backends::camera::{
    CameraBackend, CameraDevice, CaptureRequest, NormalizedPoint, RawCapture, ZoomTarget,
};
use crate::backends::motion::DeviceOrientation;
use crate::config::ZoomConfig;
use crate::constants::LensProfile;
use crate::errors::CameraError;
use crate::flash::FlashMode;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};
use worker::{Command, FocusCommand, SessionWorker};

/// A manual control write
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting {
    /// Exposure compensation in EV
    ExposureBias(f64),
    Iso(f64),
    Shutter(Duration),
    /// White balance temperature in Kelvin
    WhiteBalance(f64),
    /// Exposure compensation back to 0 EV
    AutoExposureBias,
    /// ISO back to continuous auto exposure
    AutoIso,
    /// Shutter back to continuous auto exposure
    AutoShutter,
    AutoWhiteBalance,
}

/// What a control write actually did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingOutcome {
    /// Written, with the value after clamping (seconds for shutter)
    Applied(f64),
    /// Reverted to continuous auto
    Auto,
    /// Device has no manual mode for this control; left in auto
    Unsupported,
    /// Write failed; device keeps its previous value
    Failed,
}

/// Published session state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    /// Bound device, None after a failed switch
    pub device: Option<CameraDevice>,
    /// Last requested zoom factor
    pub zoom_factor: f64,
    /// Ratio applied to the bound device
    pub zoom_ratio: f64,
    pub macro_mode: bool,
    pub exposure_bias: f64,
    /// Manual ISO, None in auto
    pub iso: Option<f64>,
    /// Manual shutter, None in auto
    pub shutter: Option<Duration>,
    /// Locked white balance, None in auto
    pub white_balance: Option<f64>,
    /// Focus and metering point, None in continuous auto
    pub point_of_interest: Option<NormalizedPoint>,
    /// Focus and exposure held by a lock
    pub focus_locked: bool,
}

/// Hardware capture result with the request it answers
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub request: CaptureRequest,
    pub raw: RawCapture,
}

/// Completion of one capture request
///
/// Resolves exactly once. Dropping it does not cancel the hardware capture;
/// the session still finishes it before accepting another.
pub struct PendingCapture {
    rx: oneshot::Receiver<Result<CapturedPhoto, CameraError>>,
    orientation: DeviceOrientation,
}

impl PendingCapture {
    /// Orientation snapshot the request was tagged with
    pub fn orientation(&self) -> DeviceOrientation {
        self.orientation
    }
}

impl Future for PendingCapture {
    type Output = Result<CapturedPhoto, CameraError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(CameraError::SessionClosed)))
    }
}

/// Entry point for starting a session
pub struct CaptureSession;

impl CaptureSession {
    /// Enumerate devices, bind the wide module and start the worker
    ///
    /// # Arguments
    /// * `backend` - Camera hardware
    /// * `config` - Zoom thresholds
    /// * `orientation` - Current device orientation, sampled at capture time
    ///
    /// # Errors
    /// [`CameraError::NoCameraFound`] if the backend has no devices, or
    /// [`CameraError::ConfigurationFailed`] if no device can be bound.
    pub fn start(
        backend: Box<dyn CameraBackend>,
        config: ZoomConfig,
        orientation: watch::Receiver<DeviceOrientation>,
    ) -> Result<SessionHandle, CameraError> {
        let in_flight = Arc::new(AtomicBool::new(false));
        let (worker, snapshot) = SessionWorker::new(backend, config, Arc::clone(&in_flight))?;
        let devices = Arc::new(worker.devices().to_vec());

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("camera-session".to_string())
            .spawn(move || worker.run(rx))
            .map_err(|e| CameraError::ConfigurationFailed(format!("session thread: {}", e)))?;

        info!(devices = devices.len(), "Capture session started");
        Ok(SessionHandle {
            tx,
            snapshot,
            orientation,
            in_flight,
            devices,
        })
    }
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    orientation: watch::Receiver<DeviceOrientation>,
    in_flight: Arc<AtomicBool>,
    devices: Arc<Vec<CameraDevice>>,
}

impl SessionHandle {
    /// Devices enumerated at startup
    pub fn available(&self) -> &[CameraDevice] {
        &self.devices
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Whether a capture is outstanding
    pub fn is_capturing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Zoom to a factor, switching modules if the mapping requires it
    ///
    /// Returns the module type and ratio actually applied.
    pub async fn set_zoom(&self, factor: f64, animated: bool) -> Result<ZoomTarget, CameraError> {
        self.request(|reply| Command::SetZoom {
            factor,
            animated,
            reply,
        })
        .await?
    }

    /// Jump to a lens preset; cancels macro mode
    pub async fn select_lens(&self, lens: LensProfile) -> Result<ZoomTarget, CameraError> {
        self.request(|reply| Command::SelectLens { lens, reply })
            .await?
    }

    pub async fn set_macro(&self, enabled: bool) -> Result<ZoomTarget, CameraError> {
        self.request(|reply| Command::SetMacro { enabled, reply })
            .await?
    }

    /// Apply a control write, clamped to the bound device's range
    pub async fn apply(&self, setting: Setting) -> SettingOutcome {
        match self.request(|reply| Command::Apply { setting, reply }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(?setting, error = %e, "Setting not applied");
                SettingOutcome::Failed
            }
        }
    }

    pub async fn set_exposure_bias(&self, ev: f64) -> SettingOutcome {
        self.apply(Setting::ExposureBias(ev)).await
    }

    pub async fn set_iso(&self, iso: f64) -> SettingOutcome {
        self.apply(Setting::Iso(iso)).await
    }

    pub async fn set_shutter(&self, duration: Duration) -> SettingOutcome {
        self.apply(Setting::Shutter(duration)).await
    }

    pub async fn set_white_balance(&self, kelvin: f64) -> SettingOutcome {
        self.apply(Setting::WhiteBalance(kelvin)).await
    }

    pub async fn set_auto_exposure_bias(&self) -> SettingOutcome {
        self.apply(Setting::AutoExposureBias).await
    }

    pub async fn set_auto_iso(&self) -> SettingOutcome {
        self.apply(Setting::AutoIso).await
    }

    pub async fn set_auto_shutter(&self) -> SettingOutcome {
        self.apply(Setting::AutoShutter).await
    }

    pub async fn set_auto_white_balance(&self) -> SettingOutcome {
        self.apply(Setting::AutoWhiteBalance).await
    }

    /// Focus and meter at a point (queued, does not wait)
    pub fn focus_at(&self, point: NormalizedPoint) {
        self.send_focus(FocusCommand::PointOfInterest(point));
    }

    /// Freeze focus and exposure (queued, does not wait)
    pub fn lock_focus_exposure(&self) {
        self.send_focus(FocusCommand::Lock);
    }

    /// Back to continuous auto focus and exposure (queued, does not wait)
    pub fn unlock(&self) {
        self.send_focus(FocusCommand::Auto);
    }

    /// Start a single-shot capture
    ///
    /// The current orientation is captured now and travels with the request.
    ///
    /// # Errors
    /// [`CameraError::CaptureInProgress`] if another capture is outstanding.
    pub fn capture(&self, flash: FlashMode) -> Result<PendingCapture, CameraError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CameraError::CaptureInProgress);
        }

        let orientation = *self.orientation.borrow();
        let (reply, rx) = oneshot::channel();
        let command = Command::Capture {
            flash,
            orientation,
            reply,
        };
        if self.tx.send(command).is_err() {
            self.in_flight.store(false, Ordering::Release);
            return Err(CameraError::SessionClosed);
        }

        info!(%flash, %orientation, "Capture requested");
        Ok(PendingCapture { rx, orientation })
    }

    /// Stop the worker and release the device
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CameraError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| CameraError::SessionClosed)?;
        rx.await.map_err(|_| CameraError::SessionClosed)
    }

    fn send_focus(&self, command: FocusCommand) {
        if self.tx.send(Command::Focus(command)).is_err() {
            warn!(?command, "Session closed, focus command dropped");
        }
    }
}

impl FocusActuator for SessionHandle {
    fn focus_at(&self, point: NormalizedPoint) {
        SessionHandle::focus_at(self, point);
    }

    fn set_exposure_bias(&self, ev: f64) {
        self.send_focus(FocusCommand::ExposureBias(ev));
    }

    fn lock_focus_exposure(&self) {
        SessionHandle::lock_focus_exposure(self);
    }

    fn revert_to_auto(&self) {
        self.unlock();
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Session worker thread
//!
//! Owns the [`DeviceSelector`] and applies commands strictly one after the
//! other. Hardware calls block, so this runs on its own OS thread rather
//! than on the async runtime.

use super::{CapturedPhoto, SessionSnapshot, Setting, SettingOutcome};
use crate::backends::camera::{
    BackendError, CameraBackend, CameraDevice, CameraType, CaptureRequest, DeviceSelector,
    NormalizedPoint, ZoomMapper, ZoomTarget,
};
use crate::backends::motion::DeviceOrientation;
use crate::config::ZoomConfig;
use crate::constants::{LensProfile, ManualControl, ShutterSpeed};
use crate::errors::CameraError;
use crate::flash::FlashMode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Ratios closer than this are treated as unchanged
const RATIO_EPSILON: f64 = 1e-6;

/// Fire-and-forget focus/exposure writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum FocusCommand {
    PointOfInterest(NormalizedPoint),
    ExposureBias(f64),
    Lock,
    Auto,
}

pub(super) enum Command {
    SetZoom {
        factor: f64,
        animated: bool,
        reply: oneshot::Sender<Result<ZoomTarget, CameraError>>,
    },
    SelectLens {
        lens: LensProfile,
        reply: oneshot::Sender<Result<ZoomTarget, CameraError>>,
    },
    SetMacro {
        enabled: bool,
        reply: oneshot::Sender<Result<ZoomTarget, CameraError>>,
    },
    Apply {
        setting: Setting,
        reply: oneshot::Sender<SettingOutcome>,
    },
    Focus(FocusCommand),
    Capture {
        flash: FlashMode,
        orientation: DeviceOrientation,
        reply: oneshot::Sender<Result<CapturedPhoto, CameraError>>,
    },
    Shutdown,
}

pub(super) struct SessionWorker {
    selector: DeviceSelector,
    mapper: ZoomMapper,
    state: SessionSnapshot,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    in_flight: Arc<AtomicBool>,
}

impl SessionWorker {
    /// Enumerate devices and bind the wide module (or its fallback)
    pub(super) fn new(
        backend: Box<dyn CameraBackend>,
        config: ZoomConfig,
        in_flight: Arc<AtomicBool>,
    ) -> Result<(Self, watch::Receiver<SessionSnapshot>), CameraError> {
        let mut selector = DeviceSelector::new(backend);
        if selector.available().is_empty() {
            warn!("No camera devices found");
            return Err(CameraError::NoCameraFound);
        }

        let mapper = ZoomMapper::for_devices(config, selector.available());
        let device = selector
            .activate(CameraType::Wide)
            .map_err(CameraError::from)?;

        let state = SessionSnapshot {
            device: Some(device),
            zoom_factor: 1.0,
            zoom_ratio: 1.0,
            ..Default::default()
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(state.clone());

        Ok((
            Self {
                selector,
                mapper,
                state,
                snapshot_tx,
                in_flight,
            },
            snapshot_rx,
        ))
    }

    pub(super) fn devices(&self) -> &[CameraDevice] {
        self.selector.available()
    }

    /// Process commands until shutdown or until every handle is gone
    pub(super) fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::SetZoom {
                    factor,
                    animated,
                    reply,
                } => {
                    let result = self.set_zoom(factor, animated);
                    let _ = reply.send(result);
                }
                Command::SelectLens { lens, reply } => {
                    info!(lens = %lens.label(), "Lens preset selected");
                    self.state.macro_mode = false;
                    let result = self.apply_zoom(lens.zoom_factor(), false);
                    let _ = reply.send(result);
                }
                Command::SetMacro { enabled, reply } => {
                    let result = self.set_macro(enabled);
                    let _ = reply.send(result);
                }
                Command::Apply { setting, reply } => {
                    let outcome = self.apply_setting(setting);
                    let _ = reply.send(outcome);
                }
                Command::Focus(command) => self.apply_focus(command),
                Command::Capture {
                    flash,
                    orientation,
                    reply,
                } => {
                    let result = self.capture(flash, orientation);
                    self.in_flight.store(false, Ordering::Release);
                    let _ = reply.send(result);
                }
                Command::Shutdown => break,
            }
        }

        self.selector.deactivate();
        info!("Capture session stopped");
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.state.clone());
    }

    // ===== Zoom =====

    fn set_zoom(&mut self, factor: f64, animated: bool) -> Result<ZoomTarget, CameraError> {
        if self.state.macro_mode {
            debug!(factor, "Macro mode active, zoom request ignored");
            return self.current_target();
        }
        self.apply_zoom(factor, animated)
    }

    fn set_macro(&mut self, enabled: bool) -> Result<ZoomTarget, CameraError> {
        if enabled {
            let target = self.mapper.macro_target();
            info!(camera_type = %target.camera_type, ratio = target.ratio, "Macro mode on");
            let applied = self.bind_and_zoom(target, false)?;
            self.state.macro_mode = true;
            self.publish();
            Ok(applied)
        } else {
            info!("Macro mode off");
            self.state.macro_mode = false;
            let factor = self.state.zoom_factor;
            self.apply_zoom(factor, false)
        }
    }

    fn apply_zoom(&mut self, factor: f64, animated: bool) -> Result<ZoomTarget, CameraError> {
        let target = match self.selector.active() {
            Some(active) => self.mapper.map_from(active.camera_type, factor),
            None => self.mapper.map(factor),
        };
        debug!(factor, camera_type = %target.camera_type, ratio = target.ratio, "Zoom mapped");

        let applied = self.bind_and_zoom(target, animated)?;
        self.state.zoom_factor = factor;
        self.publish();
        Ok(applied)
    }

    /// Bind the target's module if needed and set its ratio
    fn bind_and_zoom(&mut self, target: ZoomTarget, animated: bool) -> Result<ZoomTarget, CameraError> {
        let previous = self.selector.active().cloned();
        let resolved = self.selector.resolve(target.camera_type).map(|d| d.id.clone());
        let needs_switch = previous
            .as_ref()
            .is_none_or(|d| Some(&d.id) != resolved.as_ref());

        let device = if needs_switch {
            self.switch_device(target.camera_type, previous.as_ref())?
        } else {
            previous.clone().ok_or(CameraError::NoCameraFound)?
        };

        let mut ratio = target.ratio;
        if device.camera_type != target.camera_type {
            // Fallback module: express the requested magnification in its terms
            let factor = target.ratio * self.optical_factor(target.camera_type);
            ratio = (factor / device.native_optical_factor).max(1.0);
        }
        let ratio = device.capabilities.zoom.clamp(ratio);

        let unchanged = !needs_switch && (ratio - self.state.zoom_ratio).abs() < RATIO_EPSILON;
        if !unchanged {
            let backend = self.selector.backend_mut();
            let result = if animated && !needs_switch {
                backend.ramp_zoom_ratio(ratio, self.mapper.config().ramp_rate)
            } else {
                backend.set_zoom_ratio(ratio)
            };
            if let Err(e) = result {
                warn!(ratio, error = %e, "Failed to set zoom ratio");
                self.publish();
                return Err(CameraError::ConfigurationFailed(e.to_string()));
            }
            info!(device = %device.id, ratio, animated, "Zoom applied");
        }

        self.state.zoom_ratio = ratio;
        Ok(ZoomTarget::new(device.camera_type, ratio))
    }

    /// Switch modules; on failure try to rebind the previous one
    fn switch_device(
        &mut self,
        camera_type: CameraType,
        previous: Option<&CameraDevice>,
    ) -> Result<CameraDevice, CameraError> {
        match self.selector.activate(camera_type) {
            Ok(device) => {
                self.state.device = Some(device.clone());
                // A freshly bound module starts at its native ratio
                self.state.zoom_ratio = 1.0;
                self.reapply_controls(&device);
                Ok(device)
            }
            Err(e) => {
                warn!(%camera_type, error = %e, "Camera switch failed");
                self.state.device = None;
                if let Some(previous) = previous {
                    match self.selector.activate(previous.camera_type) {
                        Ok(restored) => {
                            info!(device = %restored.id, "Restored previous camera");
                            self.state.device = Some(restored.clone());
                            self.reapply_controls(&restored);
                            if let Err(e) = self.selector.backend_mut().set_zoom_ratio(self.state.zoom_ratio) {
                                warn!(error = %e, "Failed to restore zoom ratio");
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to restore previous camera"),
                    }
                }
                self.publish();
                Err(CameraError::from(e))
            }
        }
    }

    fn current_target(&self) -> Result<ZoomTarget, CameraError> {
        self.state
            .device
            .as_ref()
            .map(|d| ZoomTarget::new(d.camera_type, self.state.zoom_ratio))
            .ok_or(CameraError::NoCameraFound)
    }

    fn optical_factor(&self, camera_type: CameraType) -> f64 {
        self.selector
            .available()
            .iter()
            .find(|d| d.camera_type == camera_type)
            .map(|d| d.native_optical_factor)
            .unwrap_or(1.0)
    }

    // ===== Manual controls =====

    /// Carry manual settings over to a newly bound device, clamped to it
    fn reapply_controls(&mut self, device: &CameraDevice) {
        let caps = &device.capabilities;
        let backend = self.selector.backend_mut();

        if self.state.exposure_bias != 0.0 {
            let ev = caps.exposure_bias.clamp(self.state.exposure_bias);
            if backend.set_exposure_bias(ev).is_ok() {
                self.state.exposure_bias = ev;
            }
        }

        if self.state.iso.is_some() || self.state.shutter.is_some() {
            if caps.supports_manual_exposure {
                let duration = caps.exposure_duration.clamp(
                    self.state
                        .shutter
                        .unwrap_or_else(|| ShutterSpeed::default().duration()),
                );
                let iso = caps.iso.clamp(
                    self.state
                        .iso
                        .unwrap_or_else(|| ManualControl::Iso.default_value()),
                );
                match backend.set_exposure_custom(duration, iso) {
                    Ok(()) => {
                        self.state.iso = Some(iso);
                        self.state.shutter = Some(duration);
                    }
                    Err(e) => warn!(error = %e, "Manual exposure not carried over"),
                }
            } else {
                debug!(device = %device.id, "Manual exposure unsupported, staying auto");
                self.state.iso = None;
                self.state.shutter = None;
            }
        }

        if let Some(kelvin) = self.state.white_balance {
            if caps.supports_manual_white_balance {
                let kelvin = caps.white_balance.clamp(kelvin);
                if let Err(e) = backend.set_white_balance_locked(kelvin) {
                    warn!(error = %e, "White balance not carried over");
                }
                self.state.white_balance = Some(kelvin);
            } else {
                self.state.white_balance = None;
            }
        }

        let mut point_restored = true;
        if let Some(point) = self.state.point_of_interest {
            point_restored =
                caps.supports_point_of_interest && backend.set_point_of_interest(point).is_ok();
            if !point_restored {
                debug!(device = %device.id, "Point of interest not carried over");
                self.state.point_of_interest = None;
            }
        }

        if self.state.focus_locked {
            let locked = point_restored && backend.lock_focus_exposure().is_ok();
            if !locked {
                info!(device = %device.id, "Focus lock released by camera switch");
                self.state.focus_locked = false;
            }
        }
    }

    fn apply_setting(&mut self, setting: Setting) -> SettingOutcome {
        let Some(device) = self.selector.active().cloned() else {
            warn!(?setting, "No camera bound, setting dropped");
            return SettingOutcome::Failed;
        };
        let caps = device.capabilities;
        let backend = self.selector.backend_mut();

        let (result, outcome) = match setting {
            Setting::ExposureBias(ev) => {
                let ev = caps.exposure_bias.clamp(ev);
                (backend.set_exposure_bias(ev), SettingOutcome::Applied(ev))
            }
            Setting::AutoExposureBias => (backend.set_exposure_bias(0.0), SettingOutcome::Auto),
            Setting::Iso(_) | Setting::Shutter(_) if !caps.supports_manual_exposure => {
                debug!(?setting, device = %device.id, "Manual exposure unsupported");
                return SettingOutcome::Unsupported;
            }
            Setting::Iso(iso) => {
                let iso = caps.iso.clamp(iso);
                let duration = caps.exposure_duration.clamp(
                    self.state
                        .shutter
                        .unwrap_or_else(|| ShutterSpeed::default().duration()),
                );
                (
                    backend.set_exposure_custom(duration, iso),
                    SettingOutcome::Applied(iso),
                )
            }
            Setting::Shutter(duration) => {
                let duration = caps.exposure_duration.clamp(duration);
                let iso = caps.iso.clamp(
                    self.state
                        .iso
                        .unwrap_or_else(|| ManualControl::Iso.default_value()),
                );
                (
                    backend.set_exposure_custom(duration, iso),
                    SettingOutcome::Applied(duration.as_secs_f64()),
                )
            }
            Setting::AutoIso | Setting::AutoShutter => {
                (backend.set_exposure_auto(), SettingOutcome::Auto)
            }
            Setting::WhiteBalance(_) if !caps.supports_manual_white_balance => {
                debug!(device = %device.id, "Manual white balance unsupported");
                return SettingOutcome::Unsupported;
            }
            Setting::WhiteBalance(kelvin) => {
                let kelvin = caps.white_balance.clamp(kelvin);
                (
                    backend.set_white_balance_locked(kelvin),
                    SettingOutcome::Applied(kelvin),
                )
            }
            Setting::AutoWhiteBalance => (backend.set_white_balance_auto(), SettingOutcome::Auto),
        };

        match result {
            Ok(()) => {
                self.record_setting(setting, outcome);
                debug!(?setting, ?outcome, "Setting applied");
                outcome
            }
            Err(BackendError::Unsupported(what)) => {
                debug!(what = %what, "Control unsupported by backend");
                SettingOutcome::Unsupported
            }
            Err(e) => {
                warn!(?setting, error = %e, "Failed to apply setting");
                SettingOutcome::Failed
            }
        }
    }

    fn record_setting(&mut self, setting: Setting, outcome: SettingOutcome) {
        let value = match outcome {
            SettingOutcome::Applied(value) => value,
            _ => 0.0,
        };
        match setting {
            Setting::ExposureBias(_) | Setting::AutoExposureBias => {
                self.state.exposure_bias = value;
            }
            Setting::Iso(_) => {
                self.state.iso = Some(value);
                if self.state.shutter.is_none() {
                    self.state.shutter = Some(ShutterSpeed::default().duration());
                }
            }
            Setting::Shutter(_) => {
                self.state.shutter = Some(Duration::from_secs_f64(value));
                if self.state.iso.is_none() {
                    self.state.iso = Some(ManualControl::Iso.default_value());
                }
            }
            Setting::AutoIso | Setting::AutoShutter => {
                self.state.iso = None;
                self.state.shutter = None;
            }
            Setting::WhiteBalance(_) => self.state.white_balance = Some(value),
            Setting::AutoWhiteBalance => self.state.white_balance = None,
        }
        self.publish();
    }

    // ===== Focus =====

    fn apply_focus(&mut self, command: FocusCommand) {
        let Some(device) = self.selector.active().cloned() else {
            debug!(?command, "No camera bound, focus command dropped");
            return;
        };
        let backend = self.selector.backend_mut();

        let result = match command {
            FocusCommand::PointOfInterest(_) if !device.capabilities.supports_point_of_interest => {
                debug!(device = %device.id, "Point of interest unsupported");
                return;
            }
            FocusCommand::PointOfInterest(point) => {
                let result = backend.set_point_of_interest(point);
                if result.is_ok() {
                    self.state.point_of_interest = Some(point);
                    self.state.focus_locked = false;
                    self.publish();
                }
                result
            }
            FocusCommand::ExposureBias(ev) => {
                let ev = device.capabilities.exposure_bias.clamp(ev);
                let result = backend.set_exposure_bias(ev);
                if result.is_ok() {
                    self.state.exposure_bias = ev;
                    self.publish();
                }
                result
            }
            FocusCommand::Lock => {
                let result = backend.lock_focus_exposure();
                if result.is_ok() {
                    self.state.focus_locked = true;
                    self.publish();
                }
                result
            }
            FocusCommand::Auto => {
                let result = backend.set_focus_auto();
                if result.is_ok() {
                    self.state.point_of_interest = None;
                    self.state.focus_locked = false;
                    self.publish();
                }
                result
            }
        };

        if let Err(e) = result {
            warn!(?command, error = %e, "Focus command failed");
        }
    }

    // ===== Capture =====

    fn capture(
        &mut self,
        flash: FlashMode,
        orientation: DeviceOrientation,
    ) -> Result<CapturedPhoto, CameraError> {
        let device = self
            .selector
            .active()
            .cloned()
            .ok_or_else(|| CameraError::CaptureFailed("no camera bound".to_string()))?;

        let request = CaptureRequest {
            flash,
            device,
            orientation,
        };
        info!(device = %request.device.id, %orientation, "Capturing");

        match self.selector.backend_mut().capture(&request) {
            Ok(raw) => {
                info!(bytes = raw.data.len(), iso = raw.iso, "Capture complete");
                Ok(CapturedPhoto { request, raw })
            }
            Err(e) => {
                warn!(error = %e, "Capture failed");
                Err(CameraError::CaptureFailed(e.to_string()))
            }
        }
    }
}

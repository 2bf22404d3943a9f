// SPDX-License-Identifier: GPL-3.0-only

//! Simulated camera hardware
//!
//! Stands in for real modules in tests and the CLI. Clones share the same
//! simulated hardware, so a test can keep one clone to inject faults and
//! inspect applied settings while the session owns another.

use super::CameraBackend;
use super::types::*;
use crate::flash::FlashMode;
use image::{ExtendedColorType, ImageBuffer, Rgb};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// ISO reported by the simulated auto exposure
const AUTO_ISO: f64 = 100.0;
/// Shutter reported by the simulated auto exposure
const AUTO_DURATION: Duration = Duration::from_micros(8_333);
/// JPEG quality of simulated sensor output
const SENSOR_QUALITY: u8 = 90;

/// Settings the simulated hardware has received
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedLog {
    /// Id of the bound input
    pub bound: Option<String>,
    /// Highest number of simultaneously bound inputs ever observed
    pub max_bound: usize,
    /// Committed configuration transactions
    pub commits: usize,
    pub zoom_ratio: f64,
    /// Rate of the last ramp, None if the last change was immediate
    pub ramp_rate: Option<f32>,
    pub exposure_bias: f64,
    /// Custom (duration, ISO); None while in auto exposure
    pub custom_exposure: Option<(Duration, f64)>,
    /// Locked white balance temperature; None while in auto
    pub white_balance: Option<f64>,
    pub point_of_interest: Option<NormalizedPoint>,
    pub focus_locked: bool,
    pub last_flash: Option<FlashMode>,
    pub captures: usize,
}

#[derive(Debug, Default)]
struct Faults {
    fail_bind: HashSet<CameraType>,
    fail_capture: bool,
    fail_zoom: bool,
    capture_delay: Duration,
}

/// Simulated multi-module camera
#[derive(Clone)]
pub struct SimulatedBackend {
    devices: Vec<CameraDevice>,
    log: Arc<Mutex<SimulatedLog>>,
    faults: Arc<Mutex<Faults>>,
}

impl SimulatedBackend {
    /// Ultra-wide, wide and 3x telephoto modules
    pub fn new() -> Self {
        Self::with_devices(Self::default_devices())
    }

    pub fn with_devices(devices: Vec<CameraDevice>) -> Self {
        Self {
            devices,
            log: Arc::new(Mutex::new(SimulatedLog::default())),
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    /// Default module set of a triple-camera phone
    pub fn default_devices() -> Vec<CameraDevice> {
        let mut ultra_wide = CameraDevice::new("sim-ultra-wide", CameraType::UltraWide, 0.5);
        ultra_wide.aperture = 2.2;
        ultra_wide.capabilities.supports_point_of_interest = false;

        let wide = CameraDevice::new("sim-wide", CameraType::Wide, 1.0);

        let mut telephoto = CameraDevice::new("sim-telephoto", CameraType::Telephoto, 3.0);
        telephoto.aperture = 2.8;
        telephoto.capabilities.iso = ControlRange::new(50.0, 2000.0);

        vec![ultra_wide, wide, telephoto]
    }

    /// Same module set with a different sensor size on every device
    pub fn with_sensor_size(mut self, width: u32, height: u32) -> Self {
        for device in &mut self.devices {
            device.sensor_width = width;
            device.sensor_height = height;
        }
        self
    }

    /// Make binding the given module type fail
    pub fn fail_bind(&self, camera_type: CameraType, fail: bool) {
        let mut faults = lock(&self.faults);
        if fail {
            faults.fail_bind.insert(camera_type);
        } else {
            faults.fail_bind.remove(&camera_type);
        }
    }

    /// Make every capture fail until cleared
    pub fn fail_capture(&self, fail: bool) {
        lock(&self.faults).fail_capture = fail;
    }

    /// Make every zoom ratio write fail until cleared
    pub fn fail_zoom(&self, fail: bool) {
        lock(&self.faults).fail_zoom = fail;
    }

    /// Simulated exposure plus readout time
    pub fn set_capture_delay(&self, delay: Duration) {
        lock(&self.faults).capture_delay = delay;
    }

    /// Snapshot of everything applied so far
    pub fn log(&self) -> SimulatedLog {
        lock(&self.log).clone()
    }

    fn bound_device(&self) -> BackendResult<CameraDevice> {
        let log = lock(&self.log);
        let id = log.bound.as_ref().ok_or(BackendError::NotConfigured)?;
        self.devices
            .iter()
            .find(|d| &d.id == id)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound(id.clone()))
    }

    fn check_zoom(&self) -> BackendResult<()> {
        if lock(&self.faults).fail_zoom {
            return Err(BackendError::ConfigurationFailed(
                "simulated zoom failure".to_string(),
            ));
        }
        Ok(())
    }

    /// Gradient test card at the device's sensor size
    fn synthesize(device: &CameraDevice) -> BackendResult<Vec<u8>> {
        let (width, height) = (device.sensor_width.max(1), device.sensor_height.max(1));
        let image = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                if (x / 64 + y / 64) % 2 == 0 { 200 } else { 40 },
            ])
        });

        let mut data = Vec::new();
        let mut cursor = Cursor::new(&mut data);
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, SENSOR_QUALITY)
            .encode(image.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| BackendError::CaptureFailed(e.to_string()))?;
        Ok(data)
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CameraBackend for SimulatedBackend {
    fn enumerate_devices(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }

    fn begin_configuration(&mut self) {
        debug!("Simulated: begin configuration");
    }

    fn remove_input(&mut self) {
        lock(&self.log).bound = None;
    }

    fn add_input(&mut self, device: &CameraDevice) -> BackendResult<()> {
        if lock(&self.faults).fail_bind.contains(&device.camera_type) {
            return Err(BackendError::ConfigurationFailed(format!(
                "simulated bind failure for {}",
                device.id
            )));
        }

        let mut log = lock(&self.log);
        let bound = usize::from(log.bound.is_some()) + 1;
        log.max_bound = log.max_bound.max(bound);
        log.bound = Some(device.id.clone());
        log.zoom_ratio = 1.0;
        log.ramp_rate = None;
        // A freshly bound module starts in continuous auto focus
        log.point_of_interest = None;
        log.focus_locked = false;
        Ok(())
    }

    fn commit_configuration(&mut self) {
        lock(&self.log).commits += 1;
    }

    fn bound_inputs(&self) -> usize {
        usize::from(lock(&self.log).bound.is_some())
    }

    fn set_zoom_ratio(&mut self, ratio: f64) -> BackendResult<()> {
        let device = self.bound_device()?;
        self.check_zoom()?;
        let mut log = lock(&self.log);
        log.zoom_ratio = device.capabilities.zoom.clamp(ratio);
        log.ramp_rate = None;
        Ok(())
    }

    fn ramp_zoom_ratio(&mut self, ratio: f64, rate: f32) -> BackendResult<()> {
        let device = self.bound_device()?;
        self.check_zoom()?;
        let mut log = lock(&self.log);
        log.zoom_ratio = device.capabilities.zoom.clamp(ratio);
        log.ramp_rate = Some(rate);
        Ok(())
    }

    fn set_exposure_bias(&mut self, ev: f64) -> BackendResult<()> {
        self.bound_device()?;
        lock(&self.log).exposure_bias = ev;
        Ok(())
    }

    fn set_exposure_custom(&mut self, duration: Duration, iso: f64) -> BackendResult<()> {
        let device = self.bound_device()?;
        if !device.capabilities.supports_manual_exposure {
            return Err(BackendError::Unsupported("custom exposure".to_string()));
        }
        lock(&self.log).custom_exposure = Some((duration, iso));
        Ok(())
    }

    fn set_exposure_auto(&mut self) -> BackendResult<()> {
        self.bound_device()?;
        lock(&self.log).custom_exposure = None;
        Ok(())
    }

    fn set_white_balance_locked(&mut self, kelvin: f64) -> BackendResult<()> {
        let device = self.bound_device()?;
        if !device.capabilities.supports_manual_white_balance {
            return Err(BackendError::Unsupported("locked white balance".to_string()));
        }
        lock(&self.log).white_balance = Some(kelvin);
        Ok(())
    }

    fn set_white_balance_auto(&mut self) -> BackendResult<()> {
        self.bound_device()?;
        lock(&self.log).white_balance = None;
        Ok(())
    }

    fn set_point_of_interest(&mut self, point: NormalizedPoint) -> BackendResult<()> {
        let device = self.bound_device()?;
        if !device.capabilities.supports_point_of_interest {
            return Err(BackendError::Unsupported("point of interest".to_string()));
        }
        let mut log = lock(&self.log);
        log.point_of_interest = Some(point);
        log.focus_locked = false;
        Ok(())
    }

    fn set_focus_auto(&mut self) -> BackendResult<()> {
        self.bound_device()?;
        let mut log = lock(&self.log);
        log.point_of_interest = None;
        log.focus_locked = false;
        Ok(())
    }

    fn lock_focus_exposure(&mut self) -> BackendResult<()> {
        self.bound_device()?;
        lock(&self.log).focus_locked = true;
        Ok(())
    }

    fn capture(&mut self, request: &CaptureRequest) -> BackendResult<RawCapture> {
        let device = self.bound_device()?;
        let (fail, delay) = {
            let faults = lock(&self.faults);
            (faults.fail_capture, faults.capture_delay)
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if fail {
            return Err(BackendError::CaptureFailed("simulated sensor error".to_string()));
        }

        let data = Self::synthesize(&device)?;
        let mut log = lock(&self.log);
        log.captures += 1;
        log.last_flash = Some(request.flash);
        let (exposure_duration, iso) = log.custom_exposure.unwrap_or((AUTO_DURATION, AUTO_ISO));
        debug!(
            device = %device.id,
            bytes = data.len(),
            width = device.sensor_width,
            height = device.sensor_height,
            "Simulated capture"
        );

        Ok(RawCapture {
            data,
            iso,
            exposure_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::motion::DeviceOrientation;

    #[test]
    fn test_capture_requires_bound_input() {
        let mut backend = SimulatedBackend::new().with_sensor_size(64, 48);
        let request = CaptureRequest {
            flash: FlashMode::Off,
            device: CameraDevice::new("sim-wide", CameraType::Wide, 1.0),
            orientation: DeviceOrientation::Portrait,
        };
        assert_eq!(
            backend.capture(&request).unwrap_err(),
            BackendError::NotConfigured
        );

        let wide = backend.enumerate_devices()[1].clone();
        backend.add_input(&wide).expect("bind");
        let raw = backend.capture(&request).expect("capture");
        let decoded = image::load_from_memory(&raw.data).expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
        assert_eq!(raw.iso, AUTO_ISO);
    }

    #[test]
    fn test_clones_share_hardware() {
        let backend = SimulatedBackend::new();
        let mut owned = backend.clone();
        let tele = owned.enumerate_devices()[2].clone();
        owned.add_input(&tele).expect("bind");
        owned.set_zoom_ratio(50.0).expect("zoom");

        let log = backend.log();
        assert_eq!(log.bound.as_deref(), Some("sim-telephoto"));
        assert_eq!(log.zoom_ratio, 10.0);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Device selection and input binding
//!
//! The selector provides:
//! - One-time device enumeration
//! - Fallback resolution when a module type is missing
//! - Transactional input switching that never leaves two inputs bound

use super::CameraBackend;
use super::types::*;
use tracing::{info, warn};

/// Owns the backend and the single active input binding
pub struct DeviceSelector {
    backend: Box<dyn CameraBackend>,
    devices: Vec<CameraDevice>,
    active: Option<CameraDevice>,
}

impl DeviceSelector {
    /// Enumerate devices once and take ownership of the backend
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        let devices = backend.enumerate_devices();
        info!(count = devices.len(), "Enumerated camera devices");
        for device in &devices {
            info!(
                id = %device.id,
                camera_type = %device.camera_type,
                optical = device.native_optical_factor,
                "Found device"
            );
        }

        Self {
            backend,
            devices,
            active: None,
        }
    }

    /// Devices enumerated at startup
    pub fn available(&self) -> &[CameraDevice] {
        &self.devices
    }

    /// Currently bound device
    pub fn active(&self) -> Option<&CameraDevice> {
        self.active.as_ref()
    }

    /// Concrete device that `activate(camera_type)` would bind
    ///
    /// Falls back through wide, ultra-wide, telephoto when the requested
    /// type is missing.
    pub fn resolve(&self, camera_type: CameraType) -> Option<&CameraDevice> {
        self.find(camera_type).or_else(|| {
            CameraType::FALLBACK_ORDER
                .iter()
                .find_map(|fallback| self.find(*fallback))
        })
    }

    /// Bind the device for `camera_type`, replacing the current input
    ///
    /// Returns the device actually bound, which may be a fallback. Binding
    /// to the already active device is a no-op. If binding fails the old
    /// input stays removed and nothing is active afterwards.
    pub fn activate(&mut self, camera_type: CameraType) -> BackendResult<CameraDevice> {
        let device = self
            .resolve(camera_type)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound(camera_type.to_string()))?;

        if device.camera_type != camera_type {
            info!(
                requested = %camera_type,
                bound = %device.camera_type,
                "Requested camera missing, using fallback"
            );
        }

        if self.active.as_ref().is_some_and(|a| a.id == device.id) {
            return Ok(device);
        }

        info!(id = %device.id, camera_type = %device.camera_type, "Switching camera input");

        self.backend.begin_configuration();
        self.backend.remove_input();
        self.active = None;
        let result = self.backend.add_input(&device);
        self.backend.commit_configuration();

        match result {
            Ok(()) => {
                self.active = Some(device.clone());
                Ok(device)
            }
            Err(e) => {
                warn!(id = %device.id, error = %e, "Failed to bind camera input");
                Err(BackendError::ConfigurationFailed(e.to_string()))
            }
        }
    }

    /// Unbind the current input
    pub fn deactivate(&mut self) {
        if self.active.take().is_some() {
            self.backend.begin_configuration();
            self.backend.remove_input();
            self.backend.commit_configuration();
            info!("Camera input removed");
        }
    }

    /// Backend for control writes on the bound input
    pub fn backend_mut(&mut self) -> &mut dyn CameraBackend {
        self.backend.as_mut()
    }

    pub fn backend(&self) -> &dyn CameraBackend {
        self.backend.as_ref()
    }

    fn find(&self, camera_type: CameraType) -> Option<&CameraDevice> {
        self.devices.iter().find(|d| d.camera_type == camera_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::SimulatedBackend;

    #[test]
    fn test_fallback_prefers_wide() {
        let backend = SimulatedBackend::with_devices(vec![
            CameraDevice::new("uw", CameraType::UltraWide, 0.5),
            CameraDevice::new("w", CameraType::Wide, 1.0),
        ]);
        let mut selector = DeviceSelector::new(Box::new(backend));
        let bound = selector
            .activate(CameraType::Telephoto)
            .expect("fallback binds");
        assert_eq!(bound.camera_type, CameraType::Wide);
        assert_eq!(selector.backend().bound_inputs(), 1);
    }

    #[test]
    fn test_failed_bind_leaves_nothing_bound() {
        let backend = SimulatedBackend::new();
        backend.fail_bind(CameraType::Telephoto, true);
        let mut selector = DeviceSelector::new(Box::new(backend));

        selector.activate(CameraType::Wide).expect("wide binds");
        let err = selector.activate(CameraType::Telephoto).unwrap_err();
        assert!(matches!(err, BackendError::ConfigurationFailed(_)));
        assert!(selector.active().is_none());
        assert_eq!(selector.backend().bound_inputs(), 0);
    }

    #[test]
    fn test_no_devices() {
        let mut selector = DeviceSelector::new(Box::new(SimulatedBackend::with_devices(vec![])));
        assert!(selector.available().is_empty());
        assert!(matches!(
            selector.activate(CameraType::Wide),
            Err(BackendError::DeviceNotFound(_))
        ));
    }
}

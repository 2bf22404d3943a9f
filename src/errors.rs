// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture pipeline
//!
//! Configuration problems that have a safe fallback are logged and absorbed
//! where they happen. Everything here is what survives to a caller.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main error type
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Camera session errors
    Camera(CameraError),
    /// Image rendering errors
    Render(RenderError),
    /// Storage/filesystem errors
    Storage(StorageError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Camera session errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// No camera devices found
    NoCameraFound,
    /// Binding or configuring a device failed
    ConfigurationFailed(String),
    /// Another capture is still outstanding
    CaptureInProgress,
    /// The hardware reported a capture error
    CaptureFailed(String),
    /// The session worker is gone
    SessionClosed,
}

/// Image render pipeline errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Capture bytes could not be decoded
    InvalidPhotoData(String),
    /// Resize or encode failed
    RenderingFailure(String),
}

/// Asset storage errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Capture directory could not be created
    DirectoryCreationFailed(String),
    /// One of the asset files could not be written
    FileWriteFailed(String),
    /// An asset file exists but could not be removed
    FileDeleteFailed(String),
    /// The catalog collaborator rejected the record
    Catalog(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Render(e) => write!(f, "Render error: {}", e),
            AppError::Storage(e) => write!(f, "Storage error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoCameraFound => write!(f, "No camera devices found"),
            CameraError::ConfigurationFailed(msg) => write!(f, "Configuration failed: {}", msg),
            CameraError::CaptureInProgress => write!(f, "A capture is already in progress"),
            CameraError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            CameraError::SessionClosed => write!(f, "Camera session closed"),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidPhotoData(msg) => write!(f, "Invalid photo data: {}", msg),
            RenderError::RenderingFailure(msg) => write!(f, "Rendering failed: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DirectoryCreationFailed(msg) => {
                write!(f, "Failed to create capture directory: {}", msg)
            }
            StorageError::FileWriteFailed(msg) => write!(f, "Failed to write file: {}", msg),
            StorageError::FileDeleteFailed(msg) => write!(f, "Failed to delete file: {}", msg),
            StorageError::Catalog(msg) => write!(f, "Catalog error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for RenderError {}
impl std::error::Error for StorageError {}

// Conversions from sub-errors to AppError
impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(StorageError::FileWriteFailed(err.to_string()))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::FileWriteFailed(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_errors_surface_readable_messages() {
        let err: AppError = CameraError::CaptureFailed("sensor timeout".into()).into();
        assert_eq!(err.to_string(), "Camera error: Capture failed: sensor timeout");

        let err: AppError = RenderError::InvalidPhotoData("empty buffer".into()).into();
        assert_eq!(err.to_string(), "Render error: Invalid photo data: empty buffer");
    }

    #[test]
    fn test_io_error_maps_to_write_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::FileWriteFailed(_)));
    }
}

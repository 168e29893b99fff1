//! Registry error types

use crate::camera::CameraId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry exists for the camera
    CameraNotFound(CameraId),
    /// The operation needs a connected session
    NotConnected(CameraId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::CameraNotFound(id) => write!(f, "camera not found: {}", id),
            RegistryError::NotConnected(id) => write!(f, "camera not connected: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}

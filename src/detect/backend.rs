//! Detector backend trait

use async_trait::async_trait;

use crate::annotate::frame::{Detection, GeometryConvention, VideoFrame};
use crate::error::DetectorError;

/// Kind of detection backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Object detection with labeled bounding boxes
    Object,
    /// Facial landmark points
    FaceLandmark,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Object => write!(f, "object"),
            BackendKind::FaceLandmark => write!(f, "face-landmark"),
        }
    }
}

/// A detection backend
///
/// Implementations wrap a loaded model and run inference on sampled frames.
/// `detect` may be called again before a previous caller has examined its
/// result; a single annotation loop never overlaps calls, but two loops on
/// different cameras may share one loaded backend, so implementations take
/// `&self` and must be internally synchronized if they need mutability.
#[async_trait]
pub trait Detector: Send + Sync + std::fmt::Debug {
    /// Which backend kind this is
    fn kind(&self) -> BackendKind;

    /// Coordinate convention of the geometry this backend emits
    fn convention(&self) -> GeometryConvention;

    /// Run inference on one frame
    async fn detect(&self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectorError>;
}

//! Error types for the camview pipeline
//!
//! Each stage of the pipeline has its own error enum; the crate-level
//! [`Error`] wraps them for callers that drive the whole pipeline through
//! the registry.

use std::fmt;

/// Result type alias using the crate-level error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from WHEP offer/answer negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// The HTTP client could not be initialized
    ClientInit(String),
    /// The camera endpoint could not be reached (connect failure or timeout)
    Unreachable,
    /// The endpoint answered with a non-2xx HTTP status
    EndpointRejected(u16),
    /// The endpoint returned a body that is not a usable SDP answer
    ProtocolViolation,
}

impl fmt::Display for SignalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalingError::ClientInit(detail) => {
                write!(f, "failed to initialize HTTP client: {}", detail)
            }
            SignalingError::Unreachable => write!(f, "camera endpoint unreachable"),
            SignalingError::EndpointRejected(status) => {
                write!(f, "camera endpoint rejected offer: HTTP {}", status)
            }
            SignalingError::ProtocolViolation => {
                write!(f, "camera endpoint returned a malformed SDP answer")
            }
        }
    }
}

impl std::error::Error for SignalingError {}

/// Errors from loading a detector backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorLoadError {
    /// The model asset could not be fetched or opened
    AssetUnavailable(String),
    /// The asset loaded but is not usable by this backend
    Incompatible(String),
}

impl fmt::Display for DetectorLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorLoadError::AssetUnavailable(detail) => {
                write!(f, "detector asset unavailable: {}", detail)
            }
            DetectorLoadError::Incompatible(detail) => {
                write!(f, "detector asset incompatible: {}", detail)
            }
        }
    }
}

impl std::error::Error for DetectorLoadError {}

/// Errors from a single detection call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    /// Inference failed on this frame
    Inference(String),
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorError::Inference(detail) => write!(f, "inference failed: {}", detail),
        }
    }
}

impl std::error::Error for DetectorError {}

/// Errors from an established media session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The transport entered a terminal failure state after connecting
    TransportFailed,
    /// The inbound media track ended
    TrackEnded,
    /// The media source exposes no frames to sample
    NoFrameSource,
    /// The operation is not valid in the session's current phase
    InvalidPhase(&'static str),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::TransportFailed => write!(f, "media transport failed"),
            SessionError::TrackEnded => write!(f, "inbound media track ended"),
            SessionError::NoFrameSource => {
                write!(f, "media source exposes no frames to sample")
            }
            SessionError::InvalidPhase(op) => {
                write!(f, "operation '{}' not valid in current session phase", op)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Crate-level error wrapping all pipeline stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// WHEP negotiation failed
    Signaling(SignalingError),
    /// Detector backend load failed
    DetectorLoad(DetectorLoadError),
    /// Detection call failed
    Detector(DetectorError),
    /// Session-level failure
    Session(SessionError),
    /// Registry-level failure
    Registry(crate::registry::RegistryError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Signaling(e) => write!(f, "signaling error: {}", e),
            Error::DetectorLoad(e) => write!(f, "detector load error: {}", e),
            Error::Detector(e) => write!(f, "detector error: {}", e),
            Error::Session(e) => write!(f, "session error: {}", e),
            Error::Registry(e) => write!(f, "registry error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Signaling(e) => Some(e),
            Error::DetectorLoad(e) => Some(e),
            Error::Detector(e) => Some(e),
            Error::Session(e) => Some(e),
            Error::Registry(e) => Some(e),
        }
    }
}

impl From<SignalingError> for Error {
    fn from(e: SignalingError) -> Self {
        Error::Signaling(e)
    }
}

impl From<DetectorLoadError> for Error {
    fn from(e: DetectorLoadError) -> Self {
        Error::DetectorLoad(e)
    }
}

impl From<DetectorError> for Error {
    fn from(e: DetectorError) -> Self {
        Error::Detector(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Error::Session(e)
    }
}

impl From<crate::registry::RegistryError> for Error {
    fn from(e: crate::registry::RegistryError) -> Self {
        Error::Registry(e)
    }
}

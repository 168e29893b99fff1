//! Per-camera live streaming and CV annotation pipeline
//!
//! `camview` pulls live video from WHEP-speaking cameras and runs pluggable
//! computer-vision backends over the stream, drawing detections onto an
//! overlay surface in lockstep with the video.
//!
//! The pipeline is layered:
//!
//! - [`signaling`]: one-shot WHEP offer/answer negotiation over HTTP
//! - [`session`]: per-camera stream lifecycle over a media transport
//! - [`detect`]: detection backends and the memoizing detector cache
//! - [`annotate`]: the detect-then-draw loop and the overlay surface
//! - [`registry`]: orchestration, per-camera ordering, reconnect policy
//!
//! Applications drive everything through [`CameraSessionRegistry`]:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camview::detect::backends::stub::StubProvider;
//! use camview::{
//!     BackendKind, CameraRef, CameraSessionRegistry, DetectorCache, PipelineConfig,
//!     StubTransportFactory,
//! };
//!
//! # async fn run() -> camview::Result<()> {
//! let registry = CameraSessionRegistry::new(
//!     PipelineConfig::default(),
//!     Arc::new(StubTransportFactory::new()),
//!     Arc::new(DetectorCache::new(Arc::new(StubProvider::new()))),
//! )?;
//!
//! let camera = CameraRef::new("lobby", "http://camera.lan:8889");
//! registry.start(&camera).await?;
//! registry.enable_detection(camera.id(), BackendKind::Object).await?;
//! # Ok(())
//! # }
//! ```

pub mod annotate;
pub mod camera;
pub mod config;
pub mod detect;
pub mod error;
pub mod registry;
pub mod session;
pub mod signaling;

pub use annotate::{
    AnnotationFrame, AnnotationLoop, Detection, DetectionKind, FrameSource, Overlay,
    RecordingOverlay, VideoFrame,
};
pub use camera::{CameraDirectory, CameraId, CameraRef};
pub use config::PipelineConfig;
pub use detect::{BackendKind, Detector, DetectorCache, DetectorProvider};
pub use error::{
    DetectorError, DetectorLoadError, Error, Result, SessionError, SignalingError,
};
pub use registry::{CameraSessionRegistry, CameraStats, RegistryError};
pub use session::{
    MediaSource, MediaTransport, SessionEvent, SessionPhase, StreamSession,
    StubTransportFactory, TransportFactory, TransportState,
};
pub use signaling::{SessionDescription, SignalingClient};

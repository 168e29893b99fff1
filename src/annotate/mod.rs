//! Frame annotation
//!
//! The annotation loop drives the detect-then-draw cycle for one camera:
//! sample the live frame, run the active detector, redraw the overlay, then
//! schedule the next tick. Scheduling the next tick only after the draw
//! completes guarantees at most one in-flight detection per loop, so a slow
//! backend can never build up a backlog against the display refresh rate.

pub mod frame;
pub mod overlay;
pub mod runner;

pub use frame::{
    AnnotationFrame, Detection, DetectionKind, FrameSource, Geometry, GeometryConvention,
    VideoFrame,
};
pub use overlay::{DrawOp, Overlay, OverlayFactory, RecordingOverlay, RecordingOverlayFactory};
pub use runner::{AnnotationLoop, LoopHandle, SessionProbe, StopHandle, StopToken};

//! The per-camera annotation loop
//!
//! Each tick: verify the owning session is still connected and the loop has
//! not been cancelled; sample the current frame; run the detector; redraw
//! the overlay; only then schedule the next tick. The cancellation token is
//! re-checked after the detect call resolves so a result that arrives after
//! `stop()` is discarded instead of drawn.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::camera::CameraId;
use crate::detect::backend::{BackendKind, Detector};

use super::frame::{AnnotationFrame, FrameSource};
use super::overlay::{self, Overlay};

/// Liveness check the loop performs at the top of every tick
pub trait SessionProbe: Send + Sync {
    /// Whether the owning session is still connected
    fn is_connected(&self) -> bool;
}

/// Requests cancellation of one annotation loop
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    /// Create a connected handle/token pair
    pub fn new() -> (StopHandle, StopToken) {
        let (tx, rx) = watch::channel(false);
        (StopHandle { tx }, StopToken { rx })
    }

    /// Request the loop to stop
    ///
    /// Effective even while a detect call is in flight: the loop discards
    /// the late result rather than drawing it.
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cancellation token checked by the loop
#[derive(Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopToken {
    /// Whether stop has been requested (or the handle dropped)
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve when stop is requested; also aborts a pending schedule
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Handle dropped counts as a stop request
                return;
            }
        }
    }
}

/// Running annotation loop for one camera
///
/// Holds the stop handle and the task; [`shutdown`](LoopHandle::shutdown)
/// cancels the loop and waits for it to finish, which is what guarantees two
/// loops never overlap when the registry switches backends.
pub struct LoopHandle {
    kind: BackendKind,
    stop: StopHandle,
    task: JoinHandle<()>,
}

impl LoopHandle {
    /// Backend kind this loop is running
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Whether the loop task has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to fully wind down
    pub async fn shutdown(self) {
        self.stop.stop();
        // The loop always exits after observing the token
        let _ = self.task.await;
    }
}

/// The detect-then-draw scheduling loop
pub struct AnnotationLoop {
    camera: CameraId,
    detector: Arc<dyn Detector>,
    source: Arc<dyn FrameSource>,
    probe: Arc<dyn SessionProbe>,
    overlay: Arc<Mutex<dyn Overlay>>,
    tick_interval: Duration,
}

impl AnnotationLoop {
    /// Create a loop over a connected session's frame source
    pub fn new(
        camera: CameraId,
        detector: Arc<dyn Detector>,
        source: Arc<dyn FrameSource>,
        probe: Arc<dyn SessionProbe>,
        overlay: Arc<Mutex<dyn Overlay>>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            camera,
            detector,
            source,
            probe,
            overlay,
            tick_interval,
        }
    }

    /// Spawn the loop as a tokio task
    pub fn spawn(self) -> LoopHandle {
        let (stop, token) = StopHandle::new();
        let kind = self.detector.kind();
        let task = tokio::spawn(self.run(token));
        LoopHandle { kind, stop, task }
    }

    async fn run(self, mut token: StopToken) {
        tracing::debug!(
            camera = %self.camera,
            backend = %self.detector.kind(),
            "Annotation loop started"
        );

        loop {
            // Stop silently when cancelled or the session is gone
            if token.is_stopped() || !self.probe.is_connected() {
                break;
            }

            // A frame without decoded dimensions is skipped without
            // invoking the detector; the loop just reschedules
            let frame = match self.source.current_frame() {
                Some(frame) if frame.has_dimensions() => frame,
                _ => {
                    if self.next_tick(&mut token).await {
                        break;
                    }
                    continue;
                }
            };

            let result = self.detector.detect(&frame).await;

            // Re-check after the suspension point: a result that resolved
            // after stop() must not produce a draw
            if token.is_stopped() {
                break;
            }

            match result {
                Ok(detections) => {
                    let annotation = AnnotationFrame::new(frame.timestamp_ms, detections);
                    let mut overlay = self.overlay.lock().expect("overlay lock poisoned");
                    overlay::render(
                        &mut *overlay,
                        &frame,
                        &annotation,
                        self.detector.convention(),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        camera = %self.camera,
                        backend = %self.detector.kind(),
                        error = %e,
                        "Detection failed, skipping frame"
                    );
                }
            }

            // Reschedule only after the draw completed: at most one
            // in-flight detection per loop
            if self.next_tick(&mut token).await {
                break;
            }
        }

        // Stale annotations must never linger after the loop ends
        self.overlay
            .lock()
            .expect("overlay lock poisoned")
            .clear();

        tracing::debug!(
            camera = %self.camera,
            backend = %self.detector.kind(),
            "Annotation loop stopped"
        );
    }

    /// Sleep until the next tick; returns true if stopped while waiting
    async fn next_tick(&self, token: &mut StopToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.tick_interval) => false,
            _ = token.cancelled() => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::frame::VideoFrame;
    use crate::annotate::overlay::RecordingOverlay;
    use crate::detect::backends::stub::{SlowDetector, StubObjectDetector, StubFaceLandmarker};
    use crate::session::transport::SharedFrameSource;

    use std::sync::atomic::{AtomicBool, Ordering};

    use bytes::Bytes;

    struct FlagProbe(AtomicBool);

    impl FlagProbe {
        fn connected() -> Arc<Self> {
            Arc::new(Self(AtomicBool::new(true)))
        }

        fn disconnect(&self) {
            self.0.store(false, Ordering::Relaxed);
        }
    }

    impl SessionProbe for FlagProbe {
        fn is_connected(&self) -> bool {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn spawn_loop(
        detector: Arc<dyn Detector>,
        source: SharedFrameSource,
        probe: Arc<dyn SessionProbe>,
    ) -> (LoopHandle, Arc<Mutex<dyn Overlay>>) {
        let overlay: Arc<Mutex<dyn Overlay>> = Arc::new(Mutex::new(RecordingOverlay::new()));
        let handle = AnnotationLoop::new(
            CameraId::new("cam1"),
            detector,
            Arc::new(source),
            probe,
            Arc::clone(&overlay),
            Duration::from_millis(5),
        )
        .spawn();
        (handle, overlay)
    }

    #[tokio::test]
    async fn test_loop_detects_and_draws() {
        let detector = Arc::new(StubObjectDetector::new());
        let source = SharedFrameSource::new();
        source.set_frame(VideoFrame::new(640, 480, 1, Bytes::new()));

        let (handle, overlay) = spawn_loop(detector.clone(), source, FlagProbe::connected());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(detector.calls() >= 1);
        assert!(!overlay.lock().unwrap().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_dimension_frame_skips_detector() {
        let detector = Arc::new(StubObjectDetector::new());
        let source = SharedFrameSource::new();
        // Video element exists but nothing decoded yet
        source.set_frame(VideoFrame::empty());

        let (handle, _overlay) = spawn_loop(detector.clone(), source, FlagProbe::connected());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(detector.calls(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_clears_overlay() {
        let detector = Arc::new(StubObjectDetector::new());
        let source = SharedFrameSource::new();
        source.set_frame(VideoFrame::new(640, 480, 1, Bytes::new()));

        let (handle, overlay) = spawn_loop(detector, source, FlagProbe::connected());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!overlay.lock().unwrap().is_empty());

        handle.shutdown().await;
        assert!(overlay.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_late_detect_result_is_discarded() {
        let slow: Arc<dyn Detector> = Arc::new(SlowDetector::new(
            Arc::new(StubObjectDetector::new()),
            Duration::from_millis(200),
        ));
        let source = SharedFrameSource::new();
        source.set_frame(VideoFrame::new(640, 480, 1, Bytes::new()));

        let (handle, overlay) = spawn_loop(slow, source, FlagProbe::connected());

        // Cancel while the first detect call is still in flight
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        // The late result must not have been drawn
        assert!(overlay.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loop_stops_when_session_disconnects() {
        let detector = Arc::new(StubObjectDetector::new());
        let source = SharedFrameSource::new();
        source.set_frame(VideoFrame::new(640, 480, 1, Bytes::new()));
        let probe = FlagProbe::connected();

        let (handle, overlay) =
            spawn_loop(detector, source, Arc::clone(&probe) as Arc<dyn SessionProbe>);

        tokio::time::sleep(Duration::from_millis(30)).await;
        probe.disconnect();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(handle.is_finished());
        assert!(overlay.lock().unwrap().is_empty());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_landmarks_projected_to_pixel_space() {
        let detector = Arc::new(StubFaceLandmarker::new());
        let source = SharedFrameSource::new();
        source.set_frame(VideoFrame::new(100, 100, 1, Bytes::new()));

        let overlay = Arc::new(Mutex::new(RecordingOverlay::new()));
        let handle = AnnotationLoop::new(
            CameraId::new("cam1"),
            detector,
            Arc::new(source),
            FlagProbe::connected(),
            Arc::clone(&overlay) as Arc<Mutex<dyn Overlay>>,
            Duration::from_millis(5),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let overlay = overlay.lock().unwrap();
            assert_eq!(overlay.marker_count(), 8);
            // Normalized landmark ring scaled by the 100x100 surface
            let in_pixel_space = overlay.ops().iter().any(|op| {
                matches!(op, crate::annotate::overlay::DrawOp::Marker { x, .. } if *x > 1.0)
            });
            assert!(in_pixel_space);
        }
        handle.shutdown().await;
    }
}

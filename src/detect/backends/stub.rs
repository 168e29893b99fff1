//! Stub detector backends
//!
//! Deterministic backends with no model dependency. The object stub returns
//! one centered "person" box in pixel space; the face stub returns a ring of
//! normalized landmark points. Both count their calls so tests can assert on
//! loop behavior, and [`SlowDetector`] adds an artificial inference delay
//! for cancellation tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::annotate::frame::{Detection, GeometryConvention, VideoFrame};
use crate::error::{DetectorError, DetectorLoadError};

use super::super::backend::{BackendKind, Detector};
use super::super::loader::DetectorProvider;

/// Object detection stub: one centered box covering half the frame
#[derive(Debug, Default)]
pub struct StubObjectDetector {
    calls: AtomicU32,
}

impl StubObjectDetector {
    /// Create the stub
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of detect calls issued so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Detector for StubObjectDetector {
    fn kind(&self) -> BackendKind {
        BackendKind::Object
    }

    fn convention(&self) -> GeometryConvention {
        GeometryConvention::PixelSpace
    }

    async fn detect(&self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let (w, h) = (frame.width as f32, frame.height as f32);
        Ok(vec![Detection::object(
            "person",
            0.9,
            w * 0.25,
            h * 0.25,
            w * 0.5,
            h * 0.5,
        )])
    }
}

/// Face landmark stub: eight normalized points on a circle around the center
#[derive(Debug, Default)]
pub struct StubFaceLandmarker {
    calls: AtomicU32,
}

impl StubFaceLandmarker {
    /// Create the stub
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of detect calls issued so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Detector for StubFaceLandmarker {
    fn kind(&self) -> BackendKind {
        BackendKind::FaceLandmark
    }

    fn convention(&self) -> GeometryConvention {
        GeometryConvention::Normalized
    }

    async fn detect(&self, _frame: &VideoFrame) -> Result<Vec<Detection>, DetectorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let points = (0..8).map(|i| {
            let angle = (i as f32) * std::f32::consts::FRAC_PI_4;
            let x = 0.5 + 0.2 * angle.cos();
            let y = 0.5 + 0.2 * angle.sin();
            Detection::landmark(1.0, x, y)
        });
        Ok(points.collect())
    }
}

/// Wraps a detector with an artificial inference delay
#[derive(Debug)]
pub struct SlowDetector {
    inner: Arc<dyn Detector>,
    delay: Duration,
}

impl SlowDetector {
    /// Wrap `inner`, sleeping for `delay` before each detect call resolves
    pub fn new(inner: Arc<dyn Detector>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl Detector for SlowDetector {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn convention(&self) -> GeometryConvention {
        self.inner.convention()
    }

    async fn detect(&self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectorError> {
        tokio::time::sleep(self.delay).await;
        self.inner.detect(frame).await
    }
}

/// Provider serving the stub backends
///
/// Tracks load counts per kind and can be told to fail its first N loads,
/// which is how the cache's retry behavior is exercised.
#[derive(Default)]
pub struct StubProvider {
    loads: Mutex<HashMap<BackendKind, u32>>,
    fail_remaining: AtomicU32,
    detect_delay: Option<Duration>,
}

impl StubProvider {
    /// Create a provider that always succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` load calls with `AssetUnavailable`
    pub fn fail_first_loads(self, n: u32) -> Self {
        self.fail_remaining.store(n, Ordering::Relaxed);
        self
    }

    /// Delay every detect call of loaded backends by `delay`
    pub fn with_detect_delay(mut self, delay: Duration) -> Self {
        self.detect_delay = Some(delay);
        self
    }

    /// How many times a kind has been load-attempted
    pub fn load_count(&self, kind: BackendKind) -> u32 {
        let loads = self.loads.lock().expect("stub provider lock poisoned");
        loads.get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl DetectorProvider for StubProvider {
    async fn load(&self, kind: BackendKind) -> Result<Arc<dyn Detector>, DetectorLoadError> {
        {
            let mut loads = self.loads.lock().expect("stub provider lock poisoned");
            *loads.entry(kind).or_insert(0) += 1;
        }

        if self
            .fail_remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DetectorLoadError::AssetUnavailable(
                "stub provider configured to fail".to_string(),
            ));
        }

        // Yield once so concurrent first loads actually race
        tokio::task::yield_now().await;

        let detector: Arc<dyn Detector> = match kind {
            BackendKind::Object => Arc::new(StubObjectDetector::new()),
            BackendKind::FaceLandmark => Arc::new(StubFaceLandmarker::new()),
        };

        Ok(match self.detect_delay {
            Some(delay) => Arc::new(SlowDetector::new(detector, delay)),
            None => detector,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_object_stub_scales_to_frame() {
        let detector = StubObjectDetector::new();
        let frame = VideoFrame::new(640, 480, 0, Bytes::new());

        let detections = detector.detect(&frame).await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].caption(), "person (90%)");
        match detections[0].geometry {
            crate::annotate::frame::Geometry::Rect { x, y, width, height } => {
                assert_eq!((x, y), (160.0, 120.0));
                assert_eq!((width, height), (320.0, 240.0));
            }
            _ => panic!("expected a rect"),
        }
        assert_eq!(detector.calls(), 1);
    }

    #[tokio::test]
    async fn test_face_stub_is_normalized() {
        let detector = StubFaceLandmarker::new();
        assert_eq!(detector.convention(), GeometryConvention::Normalized);

        let frame = VideoFrame::new(2, 2, 0, Bytes::new());
        let detections = detector.detect(&frame).await.unwrap();
        assert_eq!(detections.len(), 8);
        for d in &detections {
            match d.geometry {
                crate::annotate::frame::Geometry::Point { x, y } => {
                    assert!((0.0..=1.0).contains(&x));
                    assert!((0.0..=1.0).contains(&y));
                }
                _ => panic!("expected a point"),
            }
        }
    }

    #[tokio::test]
    async fn test_provider_fails_then_recovers() {
        let provider = StubProvider::new().fail_first_loads(2);

        assert!(provider.load(BackendKind::Object).await.is_err());
        assert!(provider.load(BackendKind::Object).await.is_err());
        assert!(provider.load(BackendKind::Object).await.is_ok());
        assert_eq!(provider.load_count(BackendKind::Object), 3);
    }
}

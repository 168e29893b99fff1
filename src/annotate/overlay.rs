//! Overlay drawing surface
//!
//! The overlay is the drawable layer rendered on top of the video. The
//! pipeline never talks to a real canvas directly; it drives the [`Overlay`]
//! trait, and the embedding application maps draw calls onto whatever surface
//! it renders with. [`RecordingOverlay`] keeps the current visible content as
//! an ordered op list, which is also what the tests assert against.

use super::frame::{
    AnnotationFrame, Detection, DetectionKind, Geometry, GeometryConvention, VideoFrame,
};

/// Radius used for landmark point markers, in pixels
pub const MARKER_RADIUS: f32 = 2.0;

/// Minimum y position for a box caption so it never renders off-surface
const CAPTION_MIN_Y: f32 = 10.0;

/// A drawable overlay surface
pub trait Overlay: Send {
    /// Clear the surface to empty
    fn clear(&mut self);

    /// Draw the current video frame as the base layer
    fn draw_frame(&mut self, frame: &VideoFrame);

    /// Draw a bounding box with its caption anchored at `caption_y`
    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, caption: &str, caption_y: f32);

    /// Draw a point marker
    fn draw_marker(&mut self, x: f32, y: f32, radius: f32);

    /// Whether the surface currently shows nothing
    fn is_empty(&self) -> bool;
}

/// One recorded draw operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Base video frame redraw
    Frame { timestamp_ms: u64 },
    /// Bounding box with caption
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        caption: String,
        caption_y: f32,
    },
    /// Landmark point marker
    Marker { x: f32, y: f32, radius: f32 },
}

/// In-memory overlay that records draw operations in order
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    ops: Vec<DrawOp>,
}

impl RecordingOverlay {
    /// Create an empty overlay
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently visible operations, in draw order
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Count of rect ops currently visible
    pub fn rect_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { .. }))
            .count()
    }

    /// Count of marker ops currently visible
    pub fn marker_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Marker { .. }))
            .count()
    }
}

impl Overlay for RecordingOverlay {
    fn clear(&mut self) {
        self.ops.clear();
    }

    fn draw_frame(&mut self, frame: &VideoFrame) {
        self.ops.push(DrawOp::Frame {
            timestamp_ms: frame.timestamp_ms,
        });
    }

    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, caption: &str, caption_y: f32) {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            caption: caption.to_string(),
            caption_y,
        });
    }

    fn draw_marker(&mut self, x: f32, y: f32, radius: f32) {
        self.ops.push(DrawOp::Marker { x, y, radius });
    }

    fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Creates the overlay surface for a camera when its registry entry is built
///
/// Embedding applications implement this to hand the pipeline their real
/// drawing surfaces; the default produces a [`RecordingOverlay`] per camera.
pub trait OverlayFactory: Send + Sync {
    /// Create the overlay for one camera
    fn create(&self, camera: &crate::camera::CameraId) -> std::sync::Arc<std::sync::Mutex<dyn Overlay>>;
}

/// Default factory producing one [`RecordingOverlay`] per camera
#[derive(Debug, Default)]
pub struct RecordingOverlayFactory;

impl OverlayFactory for RecordingOverlayFactory {
    fn create(
        &self,
        _camera: &crate::camera::CameraId,
    ) -> std::sync::Arc<std::sync::Mutex<dyn Overlay>> {
        std::sync::Arc::new(std::sync::Mutex::new(RecordingOverlay::new()))
    }
}

/// Caption anchor for a box at the given top edge, clamped to the surface
pub fn caption_anchor_y(box_y: f32) -> f32 {
    if box_y > CAPTION_MIN_Y {
        box_y - 5.0
    } else {
        CAPTION_MIN_Y
    }
}

/// Redraw one annotation frame: clear, base frame, then every detection
///
/// Geometry is projected into the frame's pixel space according to the
/// backend's declared convention before drawing.
pub fn render(
    overlay: &mut dyn Overlay,
    frame: &VideoFrame,
    annotation: &AnnotationFrame,
    convention: GeometryConvention,
) {
    overlay.clear();
    overlay.draw_frame(frame);

    for detection in &annotation.detections {
        draw_detection(overlay, detection, convention, frame.width, frame.height);
    }
}

fn draw_detection(
    overlay: &mut dyn Overlay,
    detection: &Detection,
    convention: GeometryConvention,
    surface_w: u32,
    surface_h: u32,
) {
    let geometry = detection.geometry.project(convention, surface_w, surface_h);

    match (detection.kind, geometry) {
        (
            DetectionKind::Object,
            Geometry::Rect {
                x,
                y,
                width,
                height,
            },
        ) => {
            overlay.draw_rect(x, y, width, height, &detection.caption(), caption_anchor_y(y));
        }
        (DetectionKind::FaceLandmark, Geometry::Point { x, y }) => {
            overlay.draw_marker(x, y, MARKER_RADIUS);
        }
        // A backend emitting mismatched geometry still gets drawn sensibly
        (_, Geometry::Rect {
            x,
            y,
            width,
            height,
        }) => {
            overlay.draw_rect(x, y, width, height, &detection.caption(), caption_anchor_y(y));
        }
        (_, Geometry::Point { x, y }) => {
            overlay.draw_marker(x, y, MARKER_RADIUS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame_640x480() -> VideoFrame {
        VideoFrame::new(640, 480, 1000, Bytes::new())
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut overlay = RecordingOverlay::new();
        overlay.draw_marker(1.0, 1.0, MARKER_RADIUS);
        assert!(!overlay.is_empty());

        overlay.clear();
        assert!(overlay.is_empty());

        // Clearing twice leaves it empty
        overlay.clear();
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_render_object_detections() {
        let mut overlay = RecordingOverlay::new();
        let annotation = AnnotationFrame::new(
            1000,
            vec![
                Detection::object("person", 0.9, 10.0, 20.0, 100.0, 200.0),
                Detection::object("dog", 0.5, 300.0, 4.0, 50.0, 60.0),
            ],
        );

        render(
            &mut overlay,
            &frame_640x480(),
            &annotation,
            GeometryConvention::PixelSpace,
        );

        assert_eq!(overlay.ops()[0], DrawOp::Frame { timestamp_ms: 1000 });
        assert_eq!(overlay.rect_count(), 2);
        match &overlay.ops()[1] {
            DrawOp::Rect { caption, x, caption_y, .. } => {
                assert_eq!(caption, "person (90%)");
                assert_eq!(*x, 10.0);
                assert_eq!(*caption_y, 15.0);
            }
            op => panic!("unexpected op: {:?}", op),
        }
        // The box near the top edge gets its caption clamped onto the surface
        match &overlay.ops()[2] {
            DrawOp::Rect { caption, caption_y, .. } => {
                assert_eq!(caption, "dog (50%)");
                assert_eq!(*caption_y, 10.0);
            }
            op => panic!("unexpected op: {:?}", op),
        }
    }

    #[test]
    fn test_render_normalized_landmarks() {
        let mut overlay = RecordingOverlay::new();
        let annotation =
            AnnotationFrame::new(1000, vec![Detection::landmark(1.0, 0.5, 0.5)]);

        render(
            &mut overlay,
            &frame_640x480(),
            &annotation,
            GeometryConvention::Normalized,
        );

        assert_eq!(overlay.marker_count(), 1);
        assert_eq!(
            overlay.ops()[1],
            DrawOp::Marker {
                x: 320.0,
                y: 240.0,
                radius: MARKER_RADIUS
            }
        );
    }

    #[test]
    fn test_render_replaces_previous_content() {
        let mut overlay = RecordingOverlay::new();
        let first = AnnotationFrame::new(
            1000,
            vec![Detection::object("person", 0.9, 0.0, 0.0, 10.0, 10.0)],
        );
        let second = AnnotationFrame::new(2000, vec![]);

        render(
            &mut overlay,
            &frame_640x480(),
            &first,
            GeometryConvention::PixelSpace,
        );
        render(
            &mut overlay,
            &frame_640x480(),
            &second,
            GeometryConvention::PixelSpace,
        );

        // Only the base frame from the second render remains
        assert_eq!(overlay.ops().len(), 1);
        assert_eq!(overlay.rect_count(), 0);
    }

    #[test]
    fn test_caption_anchor_clamped() {
        assert_eq!(caption_anchor_y(100.0), 95.0);
        assert_eq!(caption_anchor_y(4.0), 10.0);
    }
}

//! Frame and annotation value types
//!
//! A [`VideoFrame`] is a snapshot of the live video surface at one instant.
//! An [`AnnotationFrame`] is the transient result of running a detector over
//! one such snapshot: produced once per loop iteration, drawn immediately,
//! then discarded.

use bytes::Bytes;

/// A sampled video frame
///
/// Cheap to clone: the pixel buffer is reference-counted via `Bytes`.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Decoded width in pixels (0 until the stream has decoded a frame)
    pub width: u32,
    /// Decoded height in pixels
    pub height: u32,
    /// Source timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Raw pixel data (layout is a backend concern)
    pub pixels: Bytes,
}

impl VideoFrame {
    /// Create a frame
    pub fn new(width: u32, height: u32, timestamp_ms: u64, pixels: Bytes) -> Self {
        Self {
            width,
            height,
            timestamp_ms,
            pixels,
        }
    }

    /// A frame with no decoded content yet
    pub fn empty() -> Self {
        Self::new(0, 0, 0, Bytes::new())
    }

    /// Whether the video has decoded usable dimensions
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Source of live video frames
///
/// Implemented by whatever owns the decoded media surface; the annotation
/// loop only ever samples the current frame, it never seeks or copies the
/// stream.
pub trait FrameSource: Send + Sync {
    /// Sample the current frame, if one has been decoded
    fn current_frame(&self) -> Option<VideoFrame>;
}

/// Coordinate convention a detector backend emits
///
/// Object detectors report boxes in source-frame pixel space; face landmark
/// backends report normalized [0,1] points that must be scaled by the
/// rendered surface before drawing. Backends declare which one they use so
/// the loop can project consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryConvention {
    /// Coordinates are pixels in the source frame
    PixelSpace,
    /// Coordinates are normalized to [0,1] in both axes
    Normalized,
}

/// Geometry of one detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Axis-aligned bounding box
    Rect { x: f32, y: f32, width: f32, height: f32 },
    /// Single point (landmark)
    Point { x: f32, y: f32 },
}

impl Geometry {
    /// Project into pixel space for a surface of the given size
    ///
    /// Pixel-space geometry passes through unchanged.
    pub fn project(&self, convention: GeometryConvention, surface_w: u32, surface_h: u32) -> Self {
        match convention {
            GeometryConvention::PixelSpace => *self,
            GeometryConvention::Normalized => {
                let (sw, sh) = (surface_w as f32, surface_h as f32);
                match *self {
                    Geometry::Rect {
                        x,
                        y,
                        width,
                        height,
                    } => Geometry::Rect {
                        x: x * sw,
                        y: y * sh,
                        width: width * sw,
                        height: height * sh,
                    },
                    Geometry::Point { x, y } => Geometry::Point {
                        x: x * sw,
                        y: y * sh,
                    },
                }
            }
        }
    }
}

/// Category of detection a backend produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionKind {
    /// Object bounding box
    Object,
    /// Facial landmark point
    FaceLandmark,
}

/// One detection result
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// What kind of detection this is
    pub kind: DetectionKind,
    /// Human-readable class label (empty for landmarks)
    pub label: String,
    /// Confidence score in [0,1]
    pub score: f32,
    /// Geometry in the backend's declared convention
    pub geometry: Geometry,
}

impl Detection {
    /// Create an object detection with a pixel-space bounding box
    pub fn object(label: impl Into<String>, score: f32, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            kind: DetectionKind::Object,
            label: label.into(),
            score,
            geometry: Geometry::Rect {
                x,
                y,
                width: w,
                height: h,
            },
        }
    }

    /// Create a facial landmark point
    pub fn landmark(score: f32, x: f32, y: f32) -> Self {
        Self {
            kind: DetectionKind::FaceLandmark,
            label: String::new(),
            score,
            geometry: Geometry::Point { x, y },
        }
    }

    /// Label annotated with the rounded confidence, e.g. "person (87%)"
    pub fn caption(&self) -> String {
        format!("{} ({}%)", self.label, (self.score * 100.0).round() as u32)
    }
}

/// Result of one detect-then-draw iteration
///
/// Transient by design: consumed by the renderer and dropped, never retained
/// across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationFrame {
    /// Timestamp of the sampled source frame
    pub source_timestamp_ms: u64,
    /// Detections in the order the backend produced them
    pub detections: Vec<Detection>,
}

impl AnnotationFrame {
    /// Create an annotation frame
    pub fn new(source_timestamp_ms: u64, detections: Vec<Detection>) -> Self {
        Self {
            source_timestamp_ms,
            detections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_has_no_dimensions() {
        assert!(!VideoFrame::empty().has_dimensions());
        assert!(VideoFrame::new(640, 480, 0, Bytes::new()).has_dimensions());
    }

    #[test]
    fn test_pixel_space_projection_is_identity() {
        let rect = Geometry::Rect {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(rect.project(GeometryConvention::PixelSpace, 640, 480), rect);
    }

    #[test]
    fn test_normalized_projection_scales() {
        let point = Geometry::Point { x: 0.5, y: 0.25 };
        let projected = point.project(GeometryConvention::Normalized, 640, 480);
        assert_eq!(projected, Geometry::Point { x: 320.0, y: 120.0 });

        let rect = Geometry::Rect {
            x: 0.1,
            y: 0.2,
            width: 0.5,
            height: 0.5,
        };
        let projected = rect.project(GeometryConvention::Normalized, 100, 200);
        assert_eq!(
            projected,
            Geometry::Rect {
                x: 10.0,
                y: 40.0,
                width: 50.0,
                height: 100.0
            }
        );
    }

    #[test]
    fn test_caption_rounds_score() {
        let d = Detection::object("person", 0.874, 0.0, 0.0, 10.0, 10.0);
        assert_eq!(d.caption(), "person (87%)");
    }
}

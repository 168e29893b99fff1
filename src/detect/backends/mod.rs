//! Concrete detector backends
//!
//! Real model backends (ONNX object detection, face landmark models) live
//! behind the [`DetectorProvider`](super::DetectorProvider) port and are
//! supplied by the embedding application. The stub backends here are
//! deterministic stand-ins for development and tests.

pub mod stub;

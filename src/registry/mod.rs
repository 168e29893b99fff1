//! Camera session registry
//!
//! The registry is the pipeline's orchestration layer: one entry per camera,
//! each owning the camera's session, its overlay surface, and its annotation
//! loop, if one is active. All lifecycle operations go through the registry
//! so that per-camera ordering holds no matter how callers interleave.
//!
//! # Architecture
//!
//! ```text
//!                      CameraSessionRegistry
//!                 ┌──────────────────────────────┐
//!                 │ cameras: HashMap<CameraId,   │
//!                 │   CameraEntry {              │
//!                 │     session: StreamSession,  │
//!                 │     detection: LoopHandle?,  │
//!                 │     overlay,                 │
//!                 │   }                          │
//!                 │ >                            │
//!                 └──────────────┬───────────────┘
//!                                │
//!          ┌─────────────────────┼─────────────────────┐
//!          │                     │                     │
//!          ▼                     ▼                     ▼
//!     [start/stop]       [enable_detection]     [monitor task]
//!     negotiate WHEP     acquire detector,      watch SessionEvents,
//!     via signaling      spawn/cancel loop      reconnect with backoff
//! ```
//!
//! Per-camera ordering comes from one async mutex per entry; the map itself
//! is only locked to look entries up. Reconnect policy lives here: a session
//! that fails mid-stream is replaced by a fresh one after a bounded number
//! of backed-off attempts, and an active annotation loop is restored on the
//! new session.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{CameraEntry, CameraStats};
pub use error::RegistryError;
pub use store::CameraSessionRegistry;

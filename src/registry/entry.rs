//! Camera entry and stats types
//!
//! This module defines the per-camera state stored in the registry.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::annotate::overlay::Overlay;
use crate::annotate::runner::{LoopHandle, StopHandle};
use crate::camera::CameraRef;
use crate::detect::backend::BackendKind;
use crate::session::session::StreamSession;
use crate::session::state::SessionPhase;

/// Entry for a single camera in the registry
///
/// The entry owns the camera's session exclusively; the session is `None`
/// only before the first `start`. The overlay outlives sessions: it is
/// created once per entry and every annotation loop draws onto the same
/// surface.
pub struct CameraEntry {
    /// The camera this entry manages
    pub(super) camera: CameraRef,

    /// Current session, replaced wholesale on restart or reconnect
    pub(super) session: Option<StreamSession>,

    /// Active annotation loop, if detection is enabled
    pub(super) detection: Option<LoopHandle>,

    /// Overlay surface all of this camera's loops draw onto
    pub(super) overlay: Arc<Mutex<dyn Overlay>>,

    /// Stop signal for the per-camera monitor task
    pub(super) monitor_stop: Option<StopHandle>,

    /// The per-camera monitor task watching session events
    pub(super) monitor_task: Option<JoinHandle<()>>,
}

impl CameraEntry {
    /// Create an entry with no session yet
    pub(super) fn new(camera: CameraRef, overlay: Arc<Mutex<dyn Overlay>>) -> Self {
        Self {
            camera,
            session: None,
            detection: None,
            overlay,
            monitor_stop: None,
            monitor_task: None,
        }
    }

    /// Current session phase, if a session was ever started
    pub fn phase(&self) -> Option<SessionPhase> {
        self.session.as_ref().map(|s| s.phase())
    }

    /// Whether the camera's stream is live
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().map(|s| s.is_connected()).unwrap_or(false)
    }

    /// Backend kind of the running annotation loop, if any
    pub fn detection_kind(&self) -> Option<BackendKind> {
        self.detection
            .as_ref()
            .filter(|handle| !handle.is_finished())
            .map(|handle| handle.kind())
    }

    /// Snapshot of the entry for introspection
    pub fn stats(&self) -> CameraStats {
        CameraStats {
            phase: self.phase(),
            detection_kind: self.detection_kind(),
            negotiation_attempts: self
                .session
                .as_ref()
                .map(|s| s.negotiation_attempts())
                .unwrap_or(0),
        }
    }
}

/// Statistics for a camera entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraStats {
    /// Current session phase (`None` before the first start)
    pub phase: Option<SessionPhase>,
    /// Backend of the running annotation loop, if any
    pub detection_kind: Option<BackendKind>,
    /// Negotiation attempts made by the current session
    pub negotiation_attempts: u32,
}

//! Camera session registry implementation
//!
//! The central registry that manages every camera's session and annotation
//! loop, and owns the reconnect policy for sessions that fail mid-stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Mutex as AsyncMutex, RwLock};

use crate::annotate::overlay::{Overlay, OverlayFactory, RecordingOverlayFactory};
use crate::annotate::runner::{AnnotationLoop, SessionProbe, StopHandle, StopToken};
use crate::camera::{CameraId, CameraRef};
use crate::config::PipelineConfig;
use crate::detect::backend::BackendKind;
use crate::detect::loader::DetectorCache;
use crate::error::{Error, SessionError};
use crate::session::session::{SessionEvent, StreamSession};
use crate::session::state::SessionPhase;
use crate::session::transport::TransportFactory;
use crate::signaling::SignalingClient;

use super::entry::{CameraEntry, CameraStats};
use super::error::RegistryError;

/// Collaborators shared between the registry and its monitor tasks
struct RegistryShared {
    config: PipelineConfig,
    signaling: SignalingClient,
    transports: Arc<dyn TransportFactory>,
    detectors: Arc<DetectorCache>,
    overlays: Arc<dyn OverlayFactory>,
}

/// Central registry for all camera sessions
///
/// The map is behind an `RwLock` and only held to look entries up; each
/// entry sits behind its own async mutex, which is what serializes start,
/// stop, and detection switches per camera. Cross-camera operations never
/// contend with each other.
pub struct CameraSessionRegistry {
    /// Map of camera id to camera entry
    cameras: RwLock<HashMap<CameraId, Arc<AsyncMutex<CameraEntry>>>>,

    /// Shared collaborators
    shared: Arc<RegistryShared>,
}

impl CameraSessionRegistry {
    /// Create a registry with recording overlays
    pub fn new(
        config: PipelineConfig,
        transports: Arc<dyn TransportFactory>,
        detectors: Arc<DetectorCache>,
    ) -> Result<Self, Error> {
        Self::with_overlay_factory(
            config,
            transports,
            detectors,
            Arc::new(RecordingOverlayFactory),
        )
    }

    /// Create a registry that draws onto application-provided overlays
    ///
    /// Fails if the signaling HTTP client cannot be built.
    pub fn with_overlay_factory(
        config: PipelineConfig,
        transports: Arc<dyn TransportFactory>,
        detectors: Arc<DetectorCache>,
        overlays: Arc<dyn OverlayFactory>,
    ) -> Result<Self, Error> {
        let signaling = SignalingClient::new(&config)?;

        Ok(Self {
            cameras: RwLock::new(HashMap::new()),
            shared: Arc::new(RegistryShared {
                config,
                signaling,
                transports,
                detectors,
                overlays,
            }),
        })
    }

    /// Get the registry configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.shared.config
    }

    /// Start a camera's stream
    ///
    /// A no-op if the camera is already connected. A closed or failed
    /// camera gets a fresh transport and a fresh session; sessions are
    /// never restarted in place.
    pub async fn start(&self, camera: &CameraRef) -> Result<(), Error> {
        let entry_arc = self.entry_or_insert(camera).await;
        let mut entry = entry_arc.lock().await;

        if entry.is_connected() {
            tracing::debug!(camera = %camera.id(), "Camera already connected");
            return Ok(());
        }

        retire(&mut entry).await;
        launch_session(&self.shared, &entry_arc, &mut entry).await
    }

    /// Stop a camera's stream and remove its entry
    ///
    /// The annotation loop is cancelled and awaited before the session is
    /// torn down, so no detect result can land on a dead session. Unknown
    /// cameras are ignored.
    pub async fn stop(&self, id: &CameraId) {
        let entry_arc = { self.cameras.write().await.remove(id) };
        let Some(entry_arc) = entry_arc else {
            return;
        };

        let mut entry = entry_arc.lock().await;
        retire(&mut entry).await;

        tracing::info!(camera = %id, "Camera stopped");
    }

    /// Enable detection on a connected camera
    ///
    /// Switching backends fully winds the previous loop down, in-flight
    /// detect call included, before the next one starts; at most one loop
    /// ever runs per camera. Enabling the backend that is already running
    /// is a no-op. On failure the camera is left with detection off.
    pub async fn enable_detection(&self, id: &CameraId, kind: BackendKind) -> Result<(), Error> {
        let entry_arc = self.entry(id).await?;
        let mut entry = entry_arc.lock().await;

        if !entry.is_connected() {
            return Err(RegistryError::NotConnected(id.clone()).into());
        }

        if entry.detection_kind() == Some(kind) {
            tracing::debug!(camera = %id, backend = %kind, "Detection already running");
            return Ok(());
        }

        if let Some(previous) = entry.detection.take() {
            previous.shutdown().await;
        }

        spawn_detection(&self.shared, &mut entry, kind).await?;
        tracing::info!(camera = %id, backend = %kind, "Detection enabled");
        Ok(())
    }

    /// Disable detection on a camera
    ///
    /// Cancels the loop and waits for it to finish; the overlay is cleared
    /// as the loop exits. A no-op when detection is off or the camera is
    /// unknown.
    pub async fn disable_detection(&self, id: &CameraId) {
        let Ok(entry_arc) = self.entry(id).await else {
            return;
        };
        let mut entry = entry_arc.lock().await;

        if let Some(handle) = entry.detection.take() {
            handle.shutdown().await;
            tracing::info!(camera = %id, "Detection disabled");
        }
    }

    /// Current session phase of a camera
    pub async fn phase(&self, id: &CameraId) -> Option<SessionPhase> {
        let entry_arc = self.entry(id).await.ok()?;
        let entry = entry_arc.lock().await;
        entry.phase()
    }

    /// Backend of the camera's running annotation loop, if any
    pub async fn detection_kind(&self, id: &CameraId) -> Option<BackendKind> {
        let entry_arc = self.entry(id).await.ok()?;
        let entry = entry_arc.lock().await;
        entry.detection_kind()
    }

    /// Whether the camera has a running annotation loop
    pub async fn is_detecting(&self, id: &CameraId) -> bool {
        self.detection_kind(id).await.is_some()
    }

    /// The camera's overlay surface
    pub async fn overlay(&self, id: &CameraId) -> Option<Arc<Mutex<dyn Overlay>>> {
        let entry_arc = self.entry(id).await.ok()?;
        let entry = entry_arc.lock().await;
        Some(Arc::clone(&entry.overlay))
    }

    /// Snapshot of a camera's entry
    pub async fn stats(&self, id: &CameraId) -> Option<CameraStats> {
        let entry_arc = self.entry(id).await.ok()?;
        let entry = entry_arc.lock().await;
        Some(entry.stats())
    }

    /// Get total number of registered cameras
    pub async fn camera_count(&self) -> usize {
        self.cameras.read().await.len()
    }

    async fn entry(&self, id: &CameraId) -> Result<Arc<AsyncMutex<CameraEntry>>, RegistryError> {
        let cameras = self.cameras.read().await;
        cameras
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::CameraNotFound(id.clone()))
    }

    async fn entry_or_insert(&self, camera: &CameraRef) -> Arc<AsyncMutex<CameraEntry>> {
        let mut cameras = self.cameras.write().await;
        cameras
            .entry(camera.id().clone())
            .or_insert_with(|| {
                let overlay = self.shared.overlays.create(camera.id());
                Arc::new(AsyncMutex::new(CameraEntry::new(camera.clone(), overlay)))
            })
            .clone()
    }
}

/// Wind down everything the entry owns: monitor, loop, then session
async fn retire(entry: &mut CameraEntry) {
    if let Some(stop) = entry.monitor_stop.take() {
        stop.stop();
    }
    if let Some(task) = entry.monitor_task.take() {
        task.abort();
    }
    if let Some(handle) = entry.detection.take() {
        handle.shutdown().await;
    }
    if let Some(mut session) = entry.session.take() {
        session.stop().await;
    }
}

/// Negotiate a fresh session for the entry and spawn its monitor
///
/// A session that fails to start is kept in the entry so the camera reads
/// as `Closed` rather than vanishing.
async fn launch_session(
    shared: &Arc<RegistryShared>,
    entry_arc: &Arc<AsyncMutex<CameraEntry>>,
    entry: &mut CameraEntry,
) -> Result<(), Error> {
    let transport = shared.transports.create(&entry.camera);
    let (mut session, events) =
        StreamSession::new(entry.camera.clone(), transport, shared.config.clone());

    let started = session.start(&shared.signaling).await;
    entry.session = Some(session);
    started?;

    let (stop, token) = StopHandle::new();
    let task = tokio::spawn(monitor_camera(
        Arc::clone(entry_arc),
        Arc::clone(shared),
        events,
        token,
    ));
    entry.monitor_stop = Some(stop);
    entry.monitor_task = Some(task);

    Ok(())
}

/// Spawn an annotation loop over the entry's connected session
async fn spawn_detection(
    shared: &RegistryShared,
    entry: &mut CameraEntry,
    kind: BackendKind,
) -> Result<(), Error> {
    let (source, probe) = {
        let session = entry
            .session
            .as_ref()
            .filter(|s| s.is_connected())
            .ok_or_else(|| RegistryError::NotConnected(entry.camera.id().clone()))?;

        let source = session
            .track_source()
            .ok_or(Error::Session(SessionError::NoFrameSource))?;
        let probe: Arc<dyn SessionProbe> = Arc::new(session.phase_probe());
        (source, probe)
    };

    let detector = shared.detectors.acquire(kind).await?;

    let handle = AnnotationLoop::new(
        entry.camera.id().clone(),
        detector,
        source,
        probe,
        Arc::clone(&entry.overlay),
        shared.config.tick_interval,
    )
    .spawn();
    entry.detection = Some(handle);

    Ok(())
}

/// Per-camera monitor task: watches session events and drives reconnects
async fn monitor_camera(
    entry: Arc<AsyncMutex<CameraEntry>>,
    shared: Arc<RegistryShared>,
    mut events: mpsc::Receiver<SessionEvent>,
    mut token: StopToken,
) {
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => return,
            event = events.recv() => match event {
                Some(event) => event,
                None => return,
            },
        };

        match event {
            SessionEvent::Failed(_) => match reconnect(&entry, &shared, &mut token).await {
                Some(new_events) => events = new_events,
                None => return,
            },
            SessionEvent::Closed => return,
            SessionEvent::TrackReady => {}
        }
    }
}

/// Replace a failed session, restoring detection if it was active
///
/// Attempts are bounded and backed off per the config. Returns the new
/// session's event stream, or `None` once every attempt failed or the
/// camera was stopped meanwhile.
async fn reconnect(
    entry_arc: &Arc<AsyncMutex<CameraEntry>>,
    shared: &Arc<RegistryShared>,
    token: &mut StopToken,
) -> Option<mpsc::Receiver<SessionEvent>> {
    let mut restore_kind: Option<BackendKind> = None;

    for attempt in 0..shared.config.max_reconnect_attempts {
        let delay = shared.config.backoff_for_attempt(attempt);
        tokio::select! {
            _ = token.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        let mut entry = entry_arc.lock().await;
        if token.is_stopped() {
            return None;
        }

        // The failed session's loop exits on its own probe check; remember
        // its backend so the new session gets it back
        if let Some(handle) = entry.detection.take() {
            restore_kind = restore_kind.or(Some(handle.kind()));
            handle.shutdown().await;
        }
        if let Some(mut session) = entry.session.take() {
            session.stop().await;
        }

        tracing::info!(
            camera = %entry.camera.id(),
            attempt = attempt + 1,
            "Attempting reconnect"
        );

        let transport = shared.transports.create(&entry.camera);
        let (mut session, new_events) =
            StreamSession::new(entry.camera.clone(), transport, shared.config.clone());

        match session.start(&shared.signaling).await {
            Ok(()) => {
                entry.session = Some(session);
                if let Some(kind) = restore_kind {
                    if let Err(e) = spawn_detection(shared, &mut entry, kind).await {
                        tracing::warn!(
                            camera = %entry.camera.id(),
                            error = %e,
                            "Could not restore detection after reconnect"
                        );
                    }
                }
                tracing::info!(camera = %entry.camera.id(), "Reconnected");
                return Some(new_events);
            }
            Err(e) => {
                entry.session = Some(session);
                tracing::warn!(
                    camera = %entry.camera.id(),
                    error = %e,
                    attempt = attempt + 1,
                    "Reconnect attempt failed"
                );
            }
        }
    }

    let entry = entry_arc.lock().await;
    tracing::warn!(
        camera = %entry.camera.id(),
        attempts = shared.config.max_reconnect_attempts,
        "Giving up after repeated reconnect failures"
    );
    None
}

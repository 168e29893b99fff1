//! Stream session lifecycle
//!
//! `Idle -(start)-> Negotiating -(answer applied)-> Connected
//!  -(stop | transport failure)-> Closed`
//!
//! A failed negotiation goes straight to `Closed`; a mid-session transport
//! failure closes the session and emits a failure event, but the session
//! never reconnects itself; that policy belongs to the registry.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::annotate::frame::FrameSource;
use crate::camera::{CameraId, CameraRef};
use crate::config::PipelineConfig;
use crate::error::{Error, SessionError, SignalingError};
use crate::signaling::SignalingClient;

use super::state::{SessionPhase, SessionState};
use super::transport::{MediaSource, MediaTransport, TransportState};

/// Events emitted by a session
#[derive(Debug)]
pub enum SessionEvent {
    /// Negotiation succeeded and the inbound track is bound; emitted exactly
    /// once per session
    TrackReady,
    /// The transport failed after connecting; the session is now closed
    Failed(SessionError),
    /// The session was stopped
    Closed,
}

/// Read-only probe into a session's phase
///
/// Handed to the annotation loop so it can verify the owning session is
/// still connected on every tick without holding the session itself.
#[derive(Clone)]
pub struct SessionPhaseProbe {
    shared: Arc<Mutex<SessionState>>,
}

impl SessionPhaseProbe {
    /// Whether the session is currently `Connected`
    pub fn is_connected(&self) -> bool {
        self.shared
            .lock()
            .expect("session state lock poisoned")
            .is_connected()
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.shared
            .lock()
            .expect("session state lock poisoned")
            .phase
    }
}

impl crate::annotate::runner::SessionProbe for SessionPhaseProbe {
    fn is_connected(&self) -> bool {
        SessionPhaseProbe::is_connected(self)
    }
}

/// One camera's live-stream session
pub struct StreamSession {
    camera: CameraRef,
    config: PipelineConfig,
    shared: Arc<Mutex<SessionState>>,
    transport: Box<dyn MediaTransport>,
    media: Option<MediaSource>,
    event_tx: mpsc::Sender<SessionEvent>,
    monitor: Option<JoinHandle<()>>,
}

impl StreamSession {
    /// Create an idle session over the given transport.
    ///
    /// Returns the session and a receiver for its lifecycle events.
    pub fn new(
        camera: CameraRef,
        transport: Box<dyn MediaTransport>,
        config: PipelineConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(16);

        let session = Self {
            camera,
            config,
            shared: Arc::new(Mutex::new(SessionState::new())),
            transport,
            media: None,
            event_tx: tx,
            monitor: None,
        };

        (session, rx)
    }

    /// The camera this session streams from
    pub fn camera(&self) -> &CameraRef {
        &self.camera
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.shared
            .lock()
            .expect("session state lock poisoned")
            .phase
    }

    /// Whether the stream is live
    pub fn is_connected(&self) -> bool {
        self.phase() == SessionPhase::Connected
    }

    /// Negotiation attempts made by this session
    pub fn negotiation_attempts(&self) -> u32 {
        self.shared
            .lock()
            .expect("session state lock poisoned")
            .negotiation_attempts
    }

    /// Phase probe for the annotation loop
    pub fn phase_probe(&self) -> SessionPhaseProbe {
        SessionPhaseProbe {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The live video surface, once connected
    ///
    /// `None` before connect and for direct-URL cameras, which have no
    /// samplable track.
    pub fn track_source(&self) -> Option<Arc<dyn FrameSource>> {
        self.media.as_ref().and_then(|m| m.frame_source())
    }

    /// The media source bound to this session, once connected
    pub fn media(&self) -> Option<&MediaSource> {
        self.media.as_ref()
    }

    /// Bind the session's media source
    ///
    /// The source kind is resolved exactly once, here: a camera configured
    /// with a direct playback URL connects without negotiating, everything
    /// else goes through the WHEP exchange and binds the inbound track.
    /// Valid only from `Idle`. On any failure the session ends up `Closed`
    /// with the transport released, never half-initialized.
    pub async fn start(&mut self, signaling: &SignalingClient) -> Result<(), Error> {
        {
            let mut state = self.shared.lock().expect("session state lock poisoned");
            if !state.start_negotiation() {
                return Err(SessionError::InvalidPhase("start").into());
            }
        }

        if let Some(url) = self.camera.direct_url() {
            self.media = Some(MediaSource::RemoteUrl(url.to_string()));
            self.shared
                .lock()
                .expect("session state lock poisoned")
                .connect();
            tracing::info!(camera = %self.camera.id(), url = %url, "Direct playback URL bound");
            let _ = self.event_tx.send(SessionEvent::TrackReady).await;
            return Ok(());
        }

        tracing::info!(camera = %self.camera.id(), "Starting WHEP negotiation");

        match self.negotiate(signaling).await {
            Ok(()) => {
                self.shared
                    .lock()
                    .expect("session state lock poisoned")
                    .connect();
                tracing::info!(camera = %self.camera.id(), "Session connected, track ready");
                let _ = self.event_tx.send(SessionEvent::TrackReady).await;
                self.spawn_monitor();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(camera = %self.camera.id(), error = %e, "Negotiation failed");
                self.shared
                    .lock()
                    .expect("session state lock poisoned")
                    .close();
                self.transport.close().await;
                Err(e)
            }
        }
    }

    async fn negotiate(&mut self, signaling: &SignalingClient) -> Result<(), Error> {
        let offer = self.transport.create_offer().await?;
        let answer = signaling.negotiate(&self.camera, &offer).await?;
        self.transport.apply_answer(answer).await?;

        self.wait_for_transport().await?;

        let track = self
            .transport
            .take_track()
            .ok_or(SessionError::TransportFailed)?;
        self.media = Some(MediaSource::LiveTrack(track));
        Ok(())
    }

    /// Wait for the transport to report `Connected`, bounded by the
    /// negotiation timeout so a dead camera cannot hang `start`
    async fn wait_for_transport(&mut self) -> Result<(), Error> {
        let mut rx = self.transport.state();

        let wait = async move {
            loop {
                let state = *rx.borrow_and_update();
                match state {
                    TransportState::Connected => return Ok(()),
                    TransportState::Failed | TransportState::Closed => {
                        return Err(Error::Signaling(SignalingError::Unreachable));
                    }
                    TransportState::New | TransportState::Connecting => {}
                }
                if rx.changed().await.is_err() {
                    return Err(Error::Signaling(SignalingError::Unreachable));
                }
            }
        };

        tokio::time::timeout(self.config.negotiation_timeout, wait)
            .await
            .map_err(|_| Error::Signaling(SignalingError::Unreachable))?
    }

    /// Watch the transport for terminal failure after connect
    fn spawn_monitor(&mut self) {
        let handle = tokio::spawn(monitor_transport(
            self.transport.state(),
            Arc::clone(&self.shared),
            self.event_tx.clone(),
            self.camera.id().clone(),
        ));
        self.monitor = Some(handle);
    }

    /// Tear the session down
    ///
    /// Valid from any phase and idempotent: the track and transport are
    /// released, and `Closed` is emitted only on the first call.
    pub async fn stop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }

        let transitioned = self
            .shared
            .lock()
            .expect("session state lock poisoned")
            .close();

        self.media = None;
        self.transport.close().await;

        if transitioned {
            tracing::info!(camera = %self.camera.id(), "Session stopped");
            let _ = self.event_tx.send(SessionEvent::Closed).await;
        }
    }
}

/// Close the session and emit `Failed` once the transport dies
///
/// The current state is inspected before the first `changed()` await, so a
/// failure that lands between the connect check and this task starting is
/// still observed.
async fn monitor_transport(
    mut rx: watch::Receiver<TransportState>,
    shared: Arc<Mutex<SessionState>>,
    event_tx: mpsc::Sender<SessionEvent>,
    camera: CameraId,
) {
    loop {
        let state = *rx.borrow_and_update();
        match state {
            TransportState::Failed => {
                let transitioned = shared
                    .lock()
                    .expect("session state lock poisoned")
                    .close();
                if transitioned {
                    tracing::warn!(camera = %camera, "Transport failed, closing session");
                    let _ = event_tx
                        .send(SessionEvent::Failed(SessionError::TransportFailed))
                        .await;
                }
                break;
            }
            TransportState::Closed => break,
            TransportState::New | TransportState::Connecting | TransportState::Connected => {}
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

//! Media transport seam
//!
//! The actual RTP/ICE plumbing is an external collaborator behind the
//! [`MediaTransport`] trait: the session drives offer/answer through it and
//! observes connectivity through a `watch` channel. [`StubTransport`]
//! provides a deterministic in-process implementation for tests and demos.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::annotate::frame::{FrameSource, VideoFrame};
use crate::camera::{CameraId, CameraRef};
use crate::error::SignalingError;
use crate::signaling::sdp::{OfferBuilder, SdpType, SessionDescription};

/// Connectivity state reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Created, no negotiation yet
    New,
    /// Answer applied, connectivity checks running
    Connecting,
    /// Media flowing
    Connected,
    /// Terminal failure (ICE failed, track ended)
    Failed,
    /// Closed locally
    Closed,
}

/// The inbound media track bound to a session
///
/// Owned exclusively by its session and released on close. The frame source
/// is the live video surface the annotation loop samples from.
pub struct MediaTrack {
    source: Arc<dyn FrameSource>,
}

impl MediaTrack {
    /// Create a track around a frame source
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self { source }
    }

    /// The live video surface carried by this track
    pub fn source(&self) -> Arc<dyn FrameSource> {
        Arc::clone(&self.source)
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack").finish_non_exhaustive()
    }
}

/// How a camera's video reaches the viewer
///
/// Resolved exactly once when the session starts; nothing downstream
/// re-checks the kind per frame.
#[derive(Debug)]
pub enum MediaSource {
    /// Direct playback URL rendered by the application; no track to sample
    RemoteUrl(String),
    /// Live track negotiated over WHEP
    LiveTrack(MediaTrack),
}

impl MediaSource {
    /// The samplable video surface, if this source carries one
    pub fn frame_source(&self) -> Option<Arc<dyn FrameSource>> {
        match self {
            MediaSource::LiveTrack(track) => Some(track.source()),
            MediaSource::RemoteUrl(_) => None,
        }
    }

    /// The playback URL, for sources the application renders itself
    pub fn remote_url(&self) -> Option<&str> {
        match self {
            MediaSource::RemoteUrl(url) => Some(url),
            MediaSource::LiveTrack(_) => None,
        }
    }
}

/// Port to the underlying peer connection
#[async_trait]
pub trait MediaTransport: Send {
    /// Build the local receive-only offer and set it as the local description
    async fn create_offer(&mut self) -> Result<SessionDescription, SignalingError>;

    /// Apply the remote answer; connectivity checks begin after this
    async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), SignalingError>;

    /// Watch connectivity state changes
    fn state(&self) -> watch::Receiver<TransportState>;

    /// Take the inbound media track once connected (at most one per transport)
    fn take_track(&mut self) -> Option<MediaTrack>;

    /// Release all transport resources
    async fn close(&mut self);
}

/// Creates a fresh transport per negotiation attempt
///
/// A closed transport is never reused; restarting a camera goes through the
/// factory again.
pub trait TransportFactory: Send + Sync {
    /// Create a transport for the given camera
    fn create(&self, camera: &CameraRef) -> Box<dyn MediaTransport>;
}

/// A frame source that can be fed from outside
///
/// Backs the stub transport's media track; tests and demos push frames into
/// it to simulate the decoder updating the live surface.
#[derive(Clone, Default)]
pub struct SharedFrameSource {
    frame: Arc<Mutex<Option<VideoFrame>>>,
}

impl SharedFrameSource {
    /// Create a source with no decoded frame yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame
    pub fn set_frame(&self, frame: VideoFrame) {
        let mut current = self.frame.lock().expect("frame source lock poisoned");
        *current = Some(frame);
    }
}

impl FrameSource for SharedFrameSource {
    fn current_frame(&self) -> Option<VideoFrame> {
        self.frame
            .lock()
            .expect("frame source lock poisoned")
            .clone()
    }
}

/// Deterministic in-process transport
///
/// Applies any valid answer and reports `Connected` immediately, exposing a
/// track backed by a [`SharedFrameSource`]. Failure can be injected through
/// the state sender held by [`StubTransportFactory`].
pub struct StubTransport {
    state_tx: watch::Sender<TransportState>,
    state_rx: watch::Receiver<TransportState>,
    source: SharedFrameSource,
    track_taken: bool,
}

impl StubTransport {
    /// Create a stub transport over the given frame source
    pub fn new(source: SharedFrameSource) -> Self {
        let (state_tx, state_rx) = watch::channel(TransportState::New);
        Self {
            state_tx,
            state_rx,
            source,
            track_taken: false,
        }
    }

    /// Sender half of the state channel, for failure injection
    pub fn state_sender(&self) -> watch::Sender<TransportState> {
        self.state_tx.clone()
    }
}

#[async_trait]
impl MediaTransport for StubTransport {
    async fn create_offer(&mut self) -> Result<SessionDescription, SignalingError> {
        Ok(OfferBuilder::new().build())
    }

    async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), SignalingError> {
        if answer.kind() != SdpType::Answer {
            return Err(SignalingError::ProtocolViolation);
        }
        let _ = self.state_tx.send(TransportState::Connecting);
        let _ = self.state_tx.send(TransportState::Connected);
        Ok(())
    }

    fn state(&self) -> watch::Receiver<TransportState> {
        self.state_rx.clone()
    }

    fn take_track(&mut self) -> Option<MediaTrack> {
        if self.track_taken || *self.state_rx.borrow() != TransportState::Connected {
            return None;
        }
        self.track_taken = true;
        Some(MediaTrack::new(Arc::new(self.source.clone())))
    }

    async fn close(&mut self) {
        let _ = self.state_tx.send(TransportState::Closed);
    }
}

/// Factory for stub transports, keyed by camera
///
/// Remembers each camera's frame source (so tests can push frames) and the
/// state sender of the most recent transport (so tests can inject a
/// mid-session failure).
#[derive(Default)]
pub struct StubTransportFactory {
    sources: Mutex<HashMap<CameraId, SharedFrameSource>>,
    senders: Mutex<HashMap<CameraId, watch::Sender<TransportState>>>,
    created: std::sync::atomic::AtomicUsize,
}

impl StubTransportFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame source for a camera, created on first use
    pub fn source_for(&self, id: &CameraId) -> SharedFrameSource {
        let mut sources = self.sources.lock().expect("factory lock poisoned");
        sources.entry(id.clone()).or_default().clone()
    }

    /// Force the camera's most recent transport into `Failed`
    ///
    /// Returns false if no transport was ever created for the camera.
    pub fn fail_transport(&self, id: &CameraId) -> bool {
        let senders = self.senders.lock().expect("factory lock poisoned");
        match senders.get(id) {
            Some(tx) => tx.send(TransportState::Failed).is_ok(),
            None => false,
        }
    }

    /// How many transports have been created so far, across all cameras
    pub fn created_count(&self) -> usize {
        self.created.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl TransportFactory for StubTransportFactory {
    fn create(&self, camera: &CameraRef) -> Box<dyn MediaTransport> {
        let source = self.source_for(camera.id());
        let transport = StubTransport::new(source);

        let mut senders = self.senders.lock().expect("factory lock poisoned");
        senders.insert(camera.id().clone(), transport.state_sender());
        self.created
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        Box::new(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_stub_transport_connects_on_answer() {
        let mut transport = StubTransport::new(SharedFrameSource::new());
        let rx = transport.state();
        assert_eq!(*rx.borrow(), TransportState::New);

        transport.create_offer().await.unwrap();
        let answer = SessionDescription::answer("v=0\r\nm=video 9 X 96\r\n").unwrap();
        transport.apply_answer(answer).await.unwrap();

        assert_eq!(*rx.borrow(), TransportState::Connected);
    }

    #[tokio::test]
    async fn test_track_taken_at_most_once() {
        let mut transport = StubTransport::new(SharedFrameSource::new());

        // Not connected yet
        assert!(transport.take_track().is_none());

        let answer = SessionDescription::answer("v=0\r\nm=video 9 X 96\r\n").unwrap();
        transport.apply_answer(answer).await.unwrap();

        assert!(transport.take_track().is_some());
        assert!(transport.take_track().is_none());
    }

    #[tokio::test]
    async fn test_shared_source_feeds_track() {
        let source = SharedFrameSource::new();
        let mut transport = StubTransport::new(source.clone());
        let answer = SessionDescription::answer("v=0\r\nm=video 9 X 96\r\n").unwrap();
        transport.apply_answer(answer).await.unwrap();
        let track = transport.take_track().unwrap();

        assert!(track.source().current_frame().is_none());
        source.set_frame(VideoFrame::new(640, 480, 42, Bytes::new()));
        assert_eq!(track.source().current_frame().unwrap().timestamp_ms, 42);
    }

    #[tokio::test]
    async fn test_factory_failure_injection() {
        let factory = StubTransportFactory::new();
        let camera = CameraRef::new("cam1", "http://cam.lan");

        assert!(!factory.fail_transport(camera.id()));

        let transport = factory.create(&camera);
        let rx = transport.state();
        assert!(factory.fail_transport(camera.id()));
        assert_eq!(*rx.borrow(), TransportState::Failed);
    }
}

//! Per-camera stream sessions
//!
//! A [`StreamSession`] owns one media connection's lifecycle for one camera:
//! negotiate, monitor, tear down. Exactly one inbound media track is ever
//! bound per session; rebinding requires a new session. Reconnect policy
//! lives in the registry, not here.

pub mod session;
pub mod state;
pub mod transport;

pub use session::{SessionEvent, SessionPhaseProbe, StreamSession};
pub use state::{SessionPhase, SessionState};
pub use transport::{
    MediaSource, MediaTrack, MediaTransport, SharedFrameSource, StubTransport,
    StubTransportFactory, TransportFactory, TransportState,
};

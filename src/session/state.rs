//! Session state machine
//!
//! Tracks one camera session from idle through negotiation to teardown.

use std::time::Instant;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, nothing started
    Idle,
    /// WHEP offer/answer exchange in progress
    Negotiating,
    /// Media track bound, stream live
    Connected,
    /// Torn down (normally or by failure); terminal
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,

    /// Number of negotiation attempts made by this session
    pub negotiation_attempts: u32,

    /// When the session was created
    pub created_at: Instant,

    /// When the session reached `Connected`
    pub connected_at: Option<Instant>,

    /// Whether a media track was ever bound
    pub track_bound: bool,
}

impl SessionState {
    /// Create an idle session state
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            negotiation_attempts: 0,
            created_at: Instant::now(),
            connected_at: None,
            track_bound: false,
        }
    }

    /// Begin negotiation; valid only from `Idle`
    pub fn start_negotiation(&mut self) -> bool {
        if self.phase != SessionPhase::Idle {
            return false;
        }
        self.phase = SessionPhase::Negotiating;
        self.negotiation_attempts += 1;
        true
    }

    /// Negotiation succeeded and the track is bound
    pub fn connect(&mut self) {
        if self.phase == SessionPhase::Negotiating {
            self.phase = SessionPhase::Connected;
            self.connected_at = Some(Instant::now());
            self.track_bound = true;
        }
    }

    /// Transition to `Closed`; valid (and idempotent) from any phase
    ///
    /// Returns true if this call performed the transition.
    pub fn close(&mut self) -> bool {
        if self.phase == SessionPhase::Closed {
            return false;
        }
        self.phase = SessionPhase::Closed;
        true
    }

    /// Whether the stream is live
    pub fn is_connected(&self) -> bool {
        self.phase == SessionPhase::Connected
    }

    /// Whether the session has reached its terminal phase
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new();
        assert_eq!(state.phase, SessionPhase::Idle);

        assert!(state.start_negotiation());
        assert_eq!(state.phase, SessionPhase::Negotiating);
        assert_eq!(state.negotiation_attempts, 1);

        state.connect();
        assert!(state.is_connected());
        assert!(state.track_bound);
        assert!(state.connected_at.is_some());

        assert!(state.close());
        assert!(state.is_closed());
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut state = SessionState::new();
        assert!(state.start_negotiation());
        assert!(!state.start_negotiation());
        assert_eq!(state.negotiation_attempts, 1);

        state.close();
        assert!(!state.start_negotiation());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut state = SessionState::new();
        assert!(state.close());
        assert!(!state.close());
        assert!(state.is_closed());
    }

    #[test]
    fn test_connect_only_from_negotiating() {
        let mut state = SessionState::new();
        state.connect();
        assert_eq!(state.phase, SessionPhase::Idle);
        assert!(!state.track_bound);
    }
}

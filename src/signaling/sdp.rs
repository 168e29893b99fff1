//! Minimal SDP handling for WHEP negotiation
//!
//! Only the subset needed here: building a receive-only audio+video offer
//! and validating the answer body returned by the camera endpoint. Full SDP
//! parsing is deliberately out of scope; the transport consumes the raw text.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::SignalingError;

/// Whether a description is an offer or an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

/// A session description exchanged during negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    kind: SdpType,
    sdp: String,
}

impl SessionDescription {
    /// Wrap an already-built offer
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Validate and wrap an answer body received from the endpoint
    ///
    /// The body must be non-empty, start with a `v=0` version line and carry
    /// at least one media section. Anything else is a protocol violation.
    pub fn answer(body: impl Into<String>) -> Result<Self, SignalingError> {
        let sdp = body.into();

        let mut lines = sdp.lines();
        let version_ok = matches!(lines.next(), Some(line) if line.trim_end() == "v=0");
        let has_media = sdp.lines().any(|l| l.starts_with("m="));

        if !version_ok || !has_media {
            return Err(SignalingError::ProtocolViolation);
        }

        Ok(Self {
            kind: SdpType::Answer,
            sdp,
        })
    }

    /// Description type
    pub fn kind(&self) -> SdpType {
        self.kind
    }

    /// Raw SDP text
    pub fn sdp(&self) -> &str {
        &self.sdp
    }

    /// Number of media sections
    pub fn media_section_count(&self) -> usize {
        self.sdp.lines().filter(|l| l.starts_with("m=")).count()
    }
}

/// Builder for the local receive-only offer
///
/// Mirrors the browser's `offerToReceiveAudio`/`offerToReceiveVideo`
/// behavior: both m-lines are present and marked `a=recvonly`.
#[derive(Debug, Clone)]
pub struct OfferBuilder {
    receive_audio: bool,
    receive_video: bool,
}

impl Default for OfferBuilder {
    fn default() -> Self {
        Self {
            receive_audio: true,
            receive_video: true,
        }
    }
}

impl OfferBuilder {
    /// Create a builder that receives both audio and video
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the audio m-line
    pub fn receive_audio(mut self, enabled: bool) -> Self {
        self.receive_audio = enabled;
        self
    }

    /// Toggle the video m-line
    pub fn receive_video(mut self, enabled: bool) -> Self {
        self.receive_video = enabled;
        self
    }

    /// Build the offer
    pub fn build(&self) -> SessionDescription {
        let session_id: u64 = rand::thread_rng().gen();
        let ufrag = random_token(8);
        let pwd = random_token(24);

        let mut sdp = String::with_capacity(512);
        sdp.push_str("v=0\r\n");
        sdp.push_str(&format!("o=- {} 0 IN IP4 0.0.0.0\r\n", session_id));
        sdp.push_str("s=-\r\n");
        sdp.push_str("t=0 0\r\n");
        sdp.push_str(&format!("a=ice-ufrag:{}\r\n", ufrag));
        sdp.push_str(&format!("a=ice-pwd:{}\r\n", pwd));

        let mut mid = 0;
        if self.receive_audio {
            sdp.push_str("m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n");
            sdp.push_str("c=IN IP4 0.0.0.0\r\n");
            sdp.push_str(&format!("a=mid:{}\r\n", mid));
            sdp.push_str("a=recvonly\r\n");
            mid += 1;
        }
        if self.receive_video {
            sdp.push_str("m=video 9 UDP/TLS/RTP/SAVPF 96\r\n");
            sdp.push_str("c=IN IP4 0.0.0.0\r\n");
            sdp.push_str(&format!("a=mid:{}\r\n", mid));
            sdp.push_str("a=recvonly\r\n");
        }

        SessionDescription::offer(sdp)
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_has_both_media_sections() {
        let offer = OfferBuilder::new().build();

        assert_eq!(offer.kind(), SdpType::Offer);
        assert_eq!(offer.media_section_count(), 2);
        assert!(offer.sdp().starts_with("v=0"));
        assert!(offer.sdp().contains("m=audio"));
        assert!(offer.sdp().contains("m=video"));
        assert_eq!(offer.sdp().matches("a=recvonly").count(), 2);
    }

    #[test]
    fn test_offer_video_only() {
        let offer = OfferBuilder::new().receive_audio(false).build();

        assert_eq!(offer.media_section_count(), 1);
        assert!(!offer.sdp().contains("m=audio"));
    }

    #[test]
    fn test_valid_answer_accepted() {
        let body = "v=0\r\no=- 1 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n\
                    m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=sendonly\r\n";
        let answer = SessionDescription::answer(body).unwrap();

        assert_eq!(answer.kind(), SdpType::Answer);
        assert_eq!(answer.media_section_count(), 1);
    }

    #[test]
    fn test_empty_answer_rejected() {
        assert_eq!(
            SessionDescription::answer("").unwrap_err(),
            SignalingError::ProtocolViolation
        );
    }

    #[test]
    fn test_answer_without_version_rejected() {
        let body = "m=video 9 UDP/TLS/RTP/SAVPF 96\r\n";
        assert_eq!(
            SessionDescription::answer(body).unwrap_err(),
            SignalingError::ProtocolViolation
        );
    }

    #[test]
    fn test_answer_without_media_rejected() {
        let body = "v=0\r\no=- 1 0 IN IP4 0.0.0.0\r\ns=-\r\n";
        assert_eq!(
            SessionDescription::answer(body).unwrap_err(),
            SignalingError::ProtocolViolation
        );
    }
}

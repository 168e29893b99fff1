//! WHEP signaling
//!
//! WHEP pulls a live stream with a single HTTP round trip:
//!
//! ```text
//! Viewer                                  Camera
//!   |                                        |
//!   |--- POST /cam/whep  (SDP offer) ------->|
//!   |        Content-Type: application/sdp   |
//!   |                                        |
//!   |<-- 201/200  (SDP answer body) ---------|
//!   |                                        |
//!   |          [Media flows over RTP]        |
//! ```
//!
//! All ICE candidates are embedded in the offer/answer bodies; there is no
//! trickle exchange. A non-2xx response is a hard failure for that
//! negotiation attempt; retry policy lives above this layer.

pub mod client;
pub mod sdp;

pub use client::SignalingClient;
pub use sdp::{OfferBuilder, SdpType, SessionDescription};

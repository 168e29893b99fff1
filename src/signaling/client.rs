//! WHEP signaling client
//!
//! Performs the offer/answer HTTP exchange with a camera endpoint. This
//! component never retries: every failure is surfaced to the caller and
//! retry policy belongs to the session/registry layer.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::camera::CameraRef;
use crate::config::PipelineConfig;
use crate::error::SignalingError;

use super::sdp::SessionDescription;

/// HTTP client for WHEP negotiation
///
/// Cheap to clone; the inner `reqwest::Client` is reference-counted and
/// shared across all cameras.
#[derive(Debug, Clone)]
pub struct SignalingClient {
    http: reqwest::Client,
    negotiation_timeout: Duration,
}

impl SignalingClient {
    /// Create a client with the pipeline's timeouts
    ///
    /// Fails only if the TLS backend cannot be initialized.
    pub fn new(config: &PipelineConfig) -> Result<Self, SignalingError> {
        let http = reqwest::Client::builder()
            .timeout(config.negotiation_timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SignalingError::ClientInit(e.to_string()))?;

        Ok(Self {
            http,
            negotiation_timeout: config.negotiation_timeout,
        })
    }

    /// Negotiation timeout this client enforces per round trip
    pub fn negotiation_timeout(&self) -> Duration {
        self.negotiation_timeout
    }

    /// POST the local offer to the camera's WHEP endpoint and return the
    /// validated remote answer
    pub async fn negotiate(
        &self,
        camera: &CameraRef,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError> {
        let url = camera.whep_url();
        tracing::debug!(camera = %camera.id(), url = %url, "Sending WHEP offer");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/sdp")
            .body(offer.sdp().to_string())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(camera = %camera.id(), error = %e, "WHEP endpoint unreachable");
                SignalingError::Unreachable
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                camera = %camera.id(),
                status = status.as_u16(),
                "WHEP endpoint rejected offer"
            );
            return Err(SignalingError::EndpointRejected(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|_| SignalingError::Unreachable)?;

        let answer = SessionDescription::answer(body).map_err(|e| {
            tracing::warn!(camera = %camera.id(), "WHEP endpoint returned malformed answer");
            e
        })?;

        tracing::info!(
            camera = %camera.id(),
            media_sections = answer.media_section_count(),
            "WHEP answer received"
        );

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::sdp::OfferBuilder;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_test::assert_ok;

    const VALID_ANSWER: &str = "v=0\r\no=- 1 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n\
                                m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=sendonly\r\n";

    /// Serve exactly one canned HTTP response, returning the request bytes
    async fn mock_endpoint(status_line: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/sdp\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                // Headers complete and we are not going to stream a huge body
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_negotiate_success() {
        let (base, server) = mock_endpoint("201 Created", VALID_ANSWER).await;
        let camera = CameraRef::new("cam1", base);
        let client = SignalingClient::new(&PipelineConfig::default()).unwrap();
        let offer = OfferBuilder::new().build();

        let answer = tokio_test::assert_ok!(client.negotiate(&camera, &offer).await);
        assert_eq!(answer.media_section_count(), 1);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /cam/whep"));
        assert!(request.to_lowercase().contains("content-type: application/sdp"));
    }

    #[tokio::test]
    async fn test_negotiate_endpoint_rejected() {
        let (base, _server) = mock_endpoint("500 Internal Server Error", "").await;
        let camera = CameraRef::new("cam1", base);
        let client = SignalingClient::new(&PipelineConfig::default()).unwrap();
        let offer = OfferBuilder::new().build();

        let err = client.negotiate(&camera, &offer).await.unwrap_err();
        assert_eq!(err, SignalingError::EndpointRejected(500));
    }

    #[tokio::test]
    async fn test_negotiate_malformed_answer() {
        let (base, _server) = mock_endpoint("200 OK", "this is not sdp").await;
        let camera = CameraRef::new("cam1", base);
        let client = SignalingClient::new(&PipelineConfig::default()).unwrap();
        let offer = OfferBuilder::new().build();

        let err = client.negotiate(&camera, &offer).await.unwrap_err();
        assert_eq!(err, SignalingError::ProtocolViolation);
    }

    #[tokio::test]
    async fn test_negotiate_unreachable() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let camera = CameraRef::new("cam1", format!("http://{}", addr));
        let config = PipelineConfig::default()
            .negotiation_timeout(Duration::from_secs(2))
            .connect_timeout(Duration::from_millis(500));
        let client = SignalingClient::new(&config).unwrap();
        let offer = OfferBuilder::new().build();

        let err = client.negotiate(&camera, &offer).await.unwrap_err();
        assert_eq!(err, SignalingError::Unreachable);
    }
}

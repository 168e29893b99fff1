//! End-to-end pipeline demo with stubbed cameras and detectors
//!
//! Run with: cargo run --example pipeline_demo
//!
//! Spins up an in-process WHEP endpoint, starts two cameras against it,
//! feeds synthetic frames through the stub transport, and walks a camera
//! through the full detection lifecycle: object detection, a switch to
//! face landmarks, disable, stop. Overlay contents are printed after each
//! step so the detect-then-draw cycle is visible.
//!
//! Set RUST_LOG=camview=debug to watch the pipeline's internal logging.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use camview::detect::backends::stub::StubProvider;
use camview::{
    BackendKind, CameraRef, CameraSessionRegistry, DetectorCache, PipelineConfig,
    StubTransportFactory, TransportFactory, VideoFrame,
};

const ANSWER: &str = "v=0\r\no=- 1 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n\
                      m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=sendonly\r\n";

/// Minimal WHEP endpoint answering every offer with a canned SDP
async fn spawn_whep_endpoint() -> Result<String, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let response = format!(
                    "HTTP/1.1 201 Created\r\nContent-Type: application/sdp\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    ANSWER.len(),
                    ANSWER
                );
                let mut buf = [0u8; 4096];
                let mut request = Vec::new();
                loop {
                    let Ok(n) = socket.read(&mut buf).await else {
                        return;
                    };
                    if n == 0 {
                        return;
                    }
                    request.extend_from_slice(&buf[..n]);
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                socket.write_all(response.as_bytes()).await.ok();
                socket.shutdown().await.ok();
            });
        }
    });

    Ok(format!("http://{}", addr))
}

async fn print_overlay(registry: &CameraSessionRegistry, camera: &CameraRef, step: &str) {
    let overlay = registry
        .overlay(camera.id())
        .await
        .expect("camera is registered");
    let empty = overlay.lock().unwrap().is_empty();
    println!(
        "[{}] camera={} overlay={}",
        step,
        camera.id(),
        if empty { "empty" } else { "annotated" }
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camview=info".parse()?)
                .add_directive("pipeline_demo=info".parse()?),
        )
        .init();

    let endpoint = spawn_whep_endpoint().await?;
    println!("WHEP endpoint listening at {}", endpoint);

    let transports = Arc::new(StubTransportFactory::new());
    let detectors = Arc::new(DetectorCache::new(Arc::new(StubProvider::new())));
    let registry = CameraSessionRegistry::new(
        PipelineConfig::default().tick_interval(Duration::from_millis(33)),
        Arc::clone(&transports) as Arc<dyn TransportFactory>,
        detectors,
    )?;

    let lobby = CameraRef::new("lobby", endpoint.clone());
    let dock = CameraRef::new("dock", endpoint);

    registry.start(&lobby).await?;
    registry.start(&dock).await?;
    println!("Started {} cameras", registry.camera_count().await);

    // Simulate the decoder updating each camera's live surface
    for camera in [&lobby, &dock] {
        transports
            .source_for(camera.id())
            .set_frame(VideoFrame::new(1280, 720, 0, Bytes::new()));
    }

    registry
        .enable_detection(lobby.id(), BackendKind::Object)
        .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    print_overlay(&registry, &lobby, "object detection").await;
    print_overlay(&registry, &dock, "no detection").await;

    // Switch backends; the object loop fully stops before landmarks start
    registry
        .enable_detection(lobby.id(), BackendKind::FaceLandmark)
        .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!(
        "[switch] camera={} backend={:?}",
        lobby.id(),
        registry.detection_kind(lobby.id()).await
    );

    registry.disable_detection(lobby.id()).await;
    print_overlay(&registry, &lobby, "detection disabled").await;

    registry.stop(lobby.id()).await;
    registry.stop(dock.id()).await;
    println!("Remaining cameras: {}", registry.camera_count().await);

    Ok(())
}

// Integration tests for the AI commentary bridge lifecycle

mod common;

use common::{scheduler_at, wait_until, FakeEndpoint, FakeMicrophone};
use stagecast::audio::pcm::samples_to_transport_text;
use stagecast::audio::UnavailableMicrophone;
use stagecast::bridge::{
    BridgeConfig, BridgeState, CommentaryBridge, EndpointEvent, GeminiLiveEndpoint,
    GeminiSettings, DEFAULT_ENDPOINT_URL, PCM_MIME_TYPE,
};
use stagecast::video::{EncodedFrame, JPEG_MIME_TYPE};
use stagecast::StreamError;
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> BridgeConfig {
    BridgeConfig {
        frame_forward_interval: Duration::from_millis(20),
    }
}

fn bridge_with(endpoint: &FakeEndpoint, microphone: &FakeMicrophone) -> CommentaryBridge {
    CommentaryBridge::new(
        fast_config(),
        Arc::new(endpoint.clone()),
        Box::new(microphone.clone()),
        scheduler_at(5.0),
    )
}

async fn connected_bridge() -> (CommentaryBridge, FakeEndpoint, FakeMicrophone) {
    let endpoint = FakeEndpoint::opening();
    let microphone = FakeMicrophone::default();
    let bridge = bridge_with(&endpoint, &microphone);

    bridge.enable().await.unwrap();
    assert!(wait_until(|| bridge.state() == BridgeState::Connected).await);

    (bridge, endpoint, microphone)
}

#[tokio::test]
async fn test_starts_disabled() {
    let bridge = bridge_with(&FakeEndpoint::opening(), &FakeMicrophone::default());
    assert_eq!(bridge.state(), BridgeState::Disabled);
    assert_eq!(bridge.status(), "AI narrator off");
}

#[tokio::test]
async fn test_enable_connects_and_streams_microphone() {
    let (bridge, endpoint, microphone) = connected_bridge().await;

    assert!(microphone.is_capturing());
    assert_eq!(bridge.status(), "AI narrator connected and watching");

    assert!(microphone.push(vec![0.5; 256]).await);
    assert!(wait_until(|| !endpoint.sent().is_empty()).await);

    let chunk = &endpoint.sent()[0];
    assert_eq!(chunk.mime_type, PCM_MIME_TYPE);
    assert!(chunk.is_audio());
    assert_eq!(chunk.data, samples_to_transport_text(&[0.5; 256]));
}

#[tokio::test]
async fn test_microphone_blocks_dropped_until_opened() {
    let endpoint = FakeEndpoint::default();
    let microphone = FakeMicrophone::default();
    let bridge = bridge_with(&endpoint, &microphone);

    bridge.enable().await.unwrap();
    assert_eq!(bridge.state(), BridgeState::Connecting);
    assert_eq!(bridge.status(), "Connecting to AI narrator...");

    assert!(microphone.push(vec![0.1; 64]).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(endpoint.sent().is_empty());

    assert!(endpoint.raise(EndpointEvent::Opened));
    assert!(wait_until(|| bridge.state() == BridgeState::Connected).await);

    assert!(microphone.push(vec![0.1; 64]).await);
    assert!(wait_until(|| endpoint.sent().len() == 1).await);
}

#[tokio::test]
async fn test_disable_while_connected_releases_everything() {
    let (bridge, endpoint, microphone) = connected_bridge().await;

    bridge.disable();

    // No acknowledgement from the endpoint is awaited
    assert_eq!(bridge.state(), BridgeState::Closed);
    assert_eq!(bridge.status(), "AI narrator off");
    assert!(!microphone.is_capturing());
    assert!(endpoint.is_closed());

    assert!(!microphone.push(vec![0.2; 64]).await);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(endpoint.sent().is_empty());
}

#[tokio::test]
async fn test_disable_is_idempotent() {
    let (bridge, _endpoint, _microphone) = connected_bridge().await;

    bridge.disable();
    bridge.disable();
    assert_eq!(bridge.state(), BridgeState::Closed);
}

#[tokio::test]
async fn test_narration_audio_reaches_scheduler() {
    let (bridge, endpoint, _microphone) = connected_bridge().await;
    let scheduler = bridge.scheduler();

    // 0.1s at 24 kHz, twice
    let audio = samples_to_transport_text(&vec![0.25; 2400]);
    assert!(endpoint.raise(EndpointEvent::AudioReceived(audio.clone())));
    assert!(endpoint.raise(EndpointEvent::AudioReceived(audio)));

    assert!(
        wait_until(|| {
            let cursor = scheduler.lock().unwrap().next_start_time();
            (cursor - 5.2).abs() < 1e-9
        })
        .await
    );
}

#[tokio::test]
async fn test_malformed_audio_is_dropped() {
    let (bridge, endpoint, _microphone) = connected_bridge().await;
    let scheduler = bridge.scheduler();

    assert!(endpoint.raise(EndpointEvent::AudioReceived("@@@".to_string())));
    assert!(endpoint.raise(EndpointEvent::AudioReceived(samples_to_transport_text(&[0.0; 240]))));

    assert!(
        wait_until(|| {
            let cursor = scheduler.lock().unwrap().next_start_time();
            (cursor - 5.01).abs() < 1e-9
        })
        .await
    );
    assert_eq!(bridge.state(), BridgeState::Connected);
}

#[tokio::test]
async fn test_frames_forwarded_on_ticker() {
    let (bridge, endpoint, _microphone) = connected_bridge().await;

    bridge.offer_frame(EncodedFrame {
        jpeg: vec![0xff, 0xd8, 0xff, 0xd9],
        width: 2,
        height: 2,
    });

    assert!(wait_until(|| !endpoint.sent().is_empty()).await);
    let chunk = &endpoint.sent()[0];
    assert_eq!(chunk.mime_type, JPEG_MIME_TYPE);
    assert_eq!(chunk.data, "/9j/2Q==");

    // Only the latest frame is sent, and only once
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(endpoint.sent().len(), 1);
}

#[tokio::test]
async fn test_endpoint_failure_is_terminal() {
    let (bridge, endpoint, microphone) = connected_bridge().await;

    assert!(endpoint.raise(EndpointEvent::Failed("quota exceeded".to_string())));
    assert!(wait_until(|| bridge.state() == BridgeState::Failed).await);

    assert_eq!(bridge.status(), "AI narrator error");
    assert!(!microphone.is_capturing());
    assert!(endpoint.is_closed());
}

#[tokio::test]
async fn test_remote_close() {
    let (bridge, endpoint, microphone) = connected_bridge().await;

    assert!(endpoint.raise(EndpointEvent::Closed));
    assert!(wait_until(|| bridge.state() == BridgeState::Closed).await);

    assert_eq!(bridge.status(), "AI narrator disconnected");
    assert!(!microphone.is_capturing());
}

#[tokio::test]
async fn test_reenable_after_failure() {
    let (bridge, endpoint, microphone) = connected_bridge().await;

    assert!(endpoint.raise(EndpointEvent::Failed("boom".to_string())));
    assert!(wait_until(|| bridge.state() == BridgeState::Failed).await);

    bridge.enable().await.unwrap();
    assert!(wait_until(|| bridge.state() == BridgeState::Connected).await);
    assert!(microphone.is_capturing());
    assert_eq!(microphone.starts.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_connection_refused() {
    let endpoint = FakeEndpoint::refusing(StreamError::EndpointConnection(
        "network unreachable".to_string(),
    ));
    let microphone = FakeMicrophone::default();
    let bridge = bridge_with(&endpoint, &microphone);

    let result = bridge.enable().await;

    assert!(matches!(result, Err(StreamError::EndpointConnection(_))));
    assert_eq!(bridge.state(), BridgeState::Failed);
    assert_eq!(bridge.status(), "AI narrator error");
    assert!(!microphone.is_capturing());
}

#[tokio::test]
async fn test_microphone_denied() {
    let endpoint = FakeEndpoint::opening();
    let bridge = CommentaryBridge::new(
        fast_config(),
        Arc::new(endpoint.clone()),
        Box::new(UnavailableMicrophone),
        scheduler_at(0.0),
    );

    let result = bridge.enable().await;

    assert!(matches!(result, Err(StreamError::MediaAcquisition(_))));
    assert_eq!(bridge.state(), BridgeState::Failed);
    assert_eq!(bridge.status(), "AI narrator error: microphone unavailable");
    assert_eq!(endpoint.connects.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_api_key_is_configuration_error() {
    let settings = GeminiSettings {
        api_key: None,
        endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
        model: "test-model".to_string(),
        voice: "Kore".to_string(),
        system_instruction: "Narrate.".to_string(),
    };
    let microphone = FakeMicrophone::default();
    let bridge = CommentaryBridge::new(
        fast_config(),
        Arc::new(GeminiLiveEndpoint::new(settings)),
        Box::new(microphone.clone()),
        scheduler_at(0.0),
    );

    let result = bridge.enable().await;

    assert!(matches!(result, Err(StreamError::Configuration(_))));
    assert_eq!(bridge.state(), BridgeState::Failed);
    assert_eq!(bridge.status(), "AI narrator error: not configured");
    assert!(!microphone.is_capturing());
}

#[tokio::test]
async fn test_drop_releases_microphone_and_session() {
    let (bridge, endpoint, microphone) = connected_bridge().await;

    drop(bridge);

    assert!(!microphone.is_capturing());
    assert!(endpoint.is_closed());
}

#[tokio::test]
async fn test_disable_clears_failure() {
    let (bridge, endpoint, _microphone) = connected_bridge().await;

    assert!(endpoint.raise(EndpointEvent::Failed("boom".to_string())));
    assert!(wait_until(|| bridge.state() == BridgeState::Failed).await);

    bridge.disable();
    assert_eq!(bridge.state(), BridgeState::Closed);
    assert_eq!(bridge.status(), "AI narrator off");
}

#[tokio::test]
async fn test_disable_before_enable_stays_disabled() {
    let bridge = bridge_with(&FakeEndpoint::opening(), &FakeMicrophone::default());

    bridge.disable();
    assert_eq!(bridge.state(), BridgeState::Disabled);
}

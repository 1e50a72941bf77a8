use anyhow::{Context, Result};
use stagecast::audio::{AudioSink, DiscardSink, WavTimelineSink, NARRATION_SAMPLE_RATE};
use stagecast::{
    create_router, create_transport, AdminSession, AppState, BusTransport, CommentaryBridge,
    Config, GeminiLiveEndpoint, MicrophoneFactory, PlaybackScheduler, SystemAudioClock,
    VideoSourceFactory,
};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/stagecast")?;

    info!("Stagecast v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let transport = create_transport(&cfg.bus.transport, &cfg.bus.nats_url).await?;
    info!("Bus transport: {}", transport.name());

    let sink: Box<dyn AudioSink> = match cfg.playback.output_wav.as_deref() {
        Some(path) => {
            info!("Narration playback rendered to {}", path);
            Box::new(WavTimelineSink::create(path, NARRATION_SAMPLE_RATE)?)
        }
        None => Box::new(DiscardSink),
    };
    let scheduler = Arc::new(Mutex::new(PlaybackScheduler::new(
        Arc::new(SystemAudioClock::new()),
        sink,
        NARRATION_SAMPLE_RATE,
    )));

    let settings = cfg.gemini_settings();
    if settings.api_key.is_none() {
        warn!("API_KEY not set; AI narration will be unavailable");
    }

    let bridge = CommentaryBridge::new(
        cfg.bridge_config(),
        Arc::new(GeminiLiveEndpoint::new(settings)),
        MicrophoneFactory::create(cfg.microphone_input()),
        scheduler,
    );

    let session_config = cfg.session_config();
    let topic = session_config.topic.clone();
    let member = transport.join(&topic).await?;
    let video = VideoSourceFactory::create(cfg.video_input());
    let admin = Arc::new(AdminSession::new(session_config, member, video, bridge).await?);

    let router = create_router(AppState::new(Arc::clone(&admin), transport, &topic));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    admin.stop_live();

    Ok(())
}

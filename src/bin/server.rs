//! Web Stream Server
//!
//! Serves live audio and waveform streams to browser viewers.
//!
//! Usage: `webstream-server [config.toml] [--simulate]`

use anyhow::Result;
use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radio_webstream::{
    audio::AudioSegment,
    channels::ChannelManager,
    config::AppConfig,
    constants::AUDIO_SAMPLE_RATE,
    source::{SampleSource, SimulatedSource},
    ui::WebStreamServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Web Stream Server");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let simulate = args.iter().any(|a| a == "--simulate");
    let config_path = args.iter().find(|a| !a.starts_with("--")).map(PathBuf::from);

    let config = AppConfig::load(config_path.as_deref())?;
    let channels = Arc::new(ChannelManager::new());
    let server = Arc::new(WebStreamServer::new(&config, channels));

    let mut simulated =
        simulate.then(|| SimulatedSource::new("simulated-0", 162_550_000, 2_400_000.0));
    if let Some(source) = simulated.as_mut() {
        source.start(16_384, 20)?;
    }

    let sources: Vec<&dyn SampleSource> = simulated
        .iter()
        .map(|s| s as &dyn SampleSource)
        .collect();
    server.start(&sources).await?;

    if simulate {
        tokio::spawn(simulate_segments(server.clone()));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    server.stop().await;
    if let Some(mut source) = simulated {
        server.detach_source(source.id());
        source.stop();
    }
    Ok(())
}

/// Emit a one second test tone segment every five seconds
async fn simulate_segments(server: Arc<WebStreamServer>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    let step = TAU * 1000.0 / AUDIO_SAMPLE_RATE as f32;

    loop {
        ticker.tick().await;
        if !server.is_running() {
            break;
        }

        let segment = Arc::new(AudioSegment::new(
            Some("Simulated".to_string()),
            chrono::Utc::now().timestamp_millis(),
        ));
        server.receive(&segment);

        for chunk in 0..50 {
            let buffer: Vec<f32> = (0..160)
                .map(|n| ((chunk * 160 + n) as f32 * step).sin() * 0.5)
                .collect();
            if let Err(e) = segment.add_audio(buffer) {
                tracing::warn!("Simulated segment: {}", e);
                break;
            }
        }
        segment.complete();
    }
}

//! VoiceBridge HTTP Server
//!
//! Main entry point: answers Twilio's webhook and relays each call's media
//! stream to the realtime speech engine.

use std::{sync::Arc, time::Duration};

use application::SpeechEngineConnector;
use infrastructure::{AppConfig, adapters::RealtimeSpeechEngineAdapter, init_tracing};
use presentation_http::{routes, state::AppState};
use tokio::{net::TcpListener, signal, sync::watch};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    let config = AppConfig::load()?;
    init_tracing(&config.telemetry)?;

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "Failed to read .env file");
        }
    }

    info!("VoiceBridge v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        anyhow::bail!("Invalid configuration: {e}");
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        model = %config.speech_engine.model,
        voice = %config.speech_engine.voice,
        stream_path = %config.telephony.stream_path,
        "Configuration loaded"
    );

    let adapter = RealtimeSpeechEngineAdapter::new(config.speech_engine.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize speech engine: {e}"))?
        .with_command_buffer(config.relay.event_buffer);
    let speech_engine: Arc<dyn SpeechEngineConnector> = Arc::new(adapter);

    let addr = config.server.bind_address();
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let (state, shutdown_tx) = AppState::new(config, speech_engine);
    let drain_state = state.clone();

    let app = routes::create_router(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx, shutdown_timeout, drain_state))
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM, then end every call in progress
async fn shutdown_signal(shutdown: watch::Sender<bool>, timeout: Duration, state: AppState) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }

    let _ = shutdown.send(true);

    info!(
        active_calls = state.active_calls(),
        "Waiting up to {:?} for calls to close...", timeout
    );
    let drained = tokio::time::timeout(timeout, async {
        while state.active_calls() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        warn!(
            active_calls = state.active_calls(),
            "Calls still open after shutdown timeout"
        );
    }
}

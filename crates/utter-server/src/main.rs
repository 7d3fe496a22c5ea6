//! Utter TTS Server - HTTP gateway for the synthesis core

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod error;
mod state;

use state::AppState;
use utter_core::{ServiceConfig, SynthesisService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "utter_server=debug,utter_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Utter TTS Server");

    // Load configuration
    let config = load_config();
    info!("Artifacts directory: {:?}", config.artifacts_dir);

    // Create the synthesis service
    let service = SynthesisService::new(config)?;
    let state = AppState::new(service);

    info!("Synthesis service initialized");

    // Build router
    let app = api::create_router(state.clone());

    // Start server
    let host = std::env::var("UTTER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = match std::env::var("UTTER_PORT") {
        Ok(raw) => match raw.parse::<u16>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid UTTER_PORT='{}', falling back to 8080", raw);
                8080
            }
        },
        Err(_) => 8080,
    };
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready. Press Ctrl+C to stop.");
    server.await?;

    Ok(())
}

/// Config file via `UTTER_CONFIG`, defaults otherwise.
fn load_config() -> ServiceConfig {
    let Ok(path) = std::env::var("UTTER_CONFIG") else {
        return ServiceConfig::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                warn!("Invalid config at {}: {}; using defaults", path, err);
                ServiceConfig::default()
            }
        },
        Err(err) => {
            warn!("Cannot read config at {}: {}; using defaults", path, err);
            ServiceConfig::default()
        }
    }
}

/// Wait for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}

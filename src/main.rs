mod answer;
mod auth;
mod chat;
mod config;
mod credential;
mod dispatch;
mod engine;
mod error;
mod html;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::chat::GraphChatClient;
use crate::config::Config;
use crate::credential::CredentialStore;
use crate::dispatch::DispatchLoop;
use crate::engine::GenieClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatbridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Chat: {}", config.chat.chat_id);
    info!("  Engine host: {}", config.engine.host);
    info!("  Poll interval: {}s", config.chat.poll_interval_secs);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.engine.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let credentials = Arc::new(CredentialStore::new());
    let chat = Arc::new(GraphChatClient::new(&config.chat, http.clone()));
    let engine = Arc::new(GenieClient::new(&config.engine, http));

    // Token ingestion runs beside the loop; the out-of-band login flow
    // delivers the bearer token here.
    let listen_addr = config.auth.listen_addr.clone();
    let auth_credentials = credentials.clone();
    tokio::spawn(async move {
        if let Err(e) = auth::serve(&listen_addr, auth_credentials).await {
            error!("Token server exited: {e:#}");
        }
    });

    info!("Bridge is starting...");
    DispatchLoop::new(credentials, chat, engine, &config.chat)
        .run()
        .await;

    Ok(())
}

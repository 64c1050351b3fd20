mod complaints;
mod config;
mod db;
mod errors;
mod identity;
mod inference;
mod models;
mod notify;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::complaints::store::PgComplaintStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::identity::HttpIdentityResolver;
use crate::inference::InferenceClient;
use crate::notify::{HttpNotifier, LogNotifier, Notifier};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Complaint API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize inference gateway
    let classifier = InferenceClient::new(config.inference_url.clone(), config.inference_timeout)?;
    if classifier.is_configured() {
        info!(
            "Inference gateway initialized (timeout: {}s)",
            config.inference_timeout.as_secs()
        );
    } else {
        warn!("INFERENCE_URL not set; every complaint will receive the fallback classification");
    }

    // Initialize identity resolution
    let identity =
        HttpIdentityResolver::new(config.identity_url.clone(), config.identity_api_key.clone())?;
    if config.identity_url.is_none() {
        warn!("IDENTITY_URL not set; all user tokens resolve to guest");
    }

    // Initialize notifications
    let notifier: Arc<dyn Notifier> = match &config.notify_url {
        Some(url) => Arc::new(HttpNotifier::new(
            url.clone(),
            config.notify_api_key.clone(),
            config.notify_sender.clone(),
        )?),
        None => Arc::new(LogNotifier),
    };

    // Build app state
    let state = AppState {
        store: Arc::new(PgComplaintStore::new(db)),
        classifier: Arc::new(classifier),
        identity: Arc::new(identity),
        notifier,
        config: config.clone(),
    };

    // Build router (CORS and request tracing are attached inside)
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;

use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contact::domain::gateway::RateLimitStore;
use contact::{
    ContactAppState, FileRateLimitStore, HubSpotClient, MessageCatalog, RecaptchaVerifier,
    SmtpMailer, contact_router,
};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,contact=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let messages = match &config.messages_path {
        Some(path) => {
            let catalog = MessageCatalog::load(path)
                .with_context(|| format!("Failed to load messages from {}", path.display()))?;
            tracing::info!(path = %path.display(), "Loaded message catalog");
            catalog
        }
        None => MessageCatalog::builtin().clone(),
    };

    let store = Arc::new(
        FileRateLimitStore::open(&config.rate_limit_dir).with_context(|| {
            format!(
                "Failed to create rate-limit directory {}",
                config.rate_limit_dir.display()
            )
        })?,
    );
    tracing::info!(dir = %store.dir().display(), "Rate-limit store ready");

    let captcha = RecaptchaVerifier::new(config.captcha.clone())?;
    let mailer = SmtpMailer::new(&config.smtp)?;
    let crm = HubSpotClient::new(config.crm.clone())?;
    if config.crm.api_key.is_none() {
        tracing::info!("HUBSPOT_API_KEY not set, CRM sync disabled");
    }

    // Scheduled sweep in addition to the per-request one
    if let Some(interval) = config.sweep_interval {
        let store = store.clone();
        let sweep = config.contact.sweep;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match tokio::time::timeout(sweep.timeout, store.sweep(sweep.max_age)).await {
                    Ok(Ok(removed)) => tracing::info!(removed, "Scheduled rate-limit sweep finished"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "Scheduled rate-limit sweep failed"),
                    Err(_) => tracing::warn!("Scheduled rate-limit sweep timed out"),
                }
            }
        });
    }

    let state = ContactAppState {
        store,
        captcha: Arc::new(captcha),
        mailer: Arc::new(mailer),
        crm: Arc::new(crm),
        config: Arc::new(config.contact),
        crm_config: Arc::new(config.crm),
        messages: Arc::new(messages),
    };

    // Build router
    let app = Router::new()
        .merge(contact_router(state))
        .layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

mod config;
mod platform;
mod responder;
mod shortener;
mod validator;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::responder::Responder;
use crate::shortener::BitlyClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shortlink_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Shortening endpoint: {}", config.bitly.api_base_url);
    if let Some(domain) = &config.bitly.domain {
        info!("  Short domain: {}", domain);
    }
    if config.telegram.allowed_user_ids.is_empty() {
        info!("  Allowed users: everyone");
    } else {
        info!("  Allowed users: {:?}", config.telegram.allowed_user_ids);
    }

    let shortener = Arc::new(BitlyClient::new(config.bitly.clone()));
    let responder = Arc::new(Responder::new(shortener));

    info!("Bot is starting...");
    platform::telegram::run(responder, &config.telegram).await?;

    Ok(())
}

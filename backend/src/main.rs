use anyhow::Context;
use chrono::Utc;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use backend::config::AppConfig;
use backend::repositories::{
    lead_repository::LeadRepository, metrics_repository::MetricsRepository, whitelist_repository::WhitelistRepository,
};
use backend::services::{handle_resolver::BotApiResolver, lead_notifier::TelegramLeadNotifier};
use backend::{build_router, init_pool, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let pool = init_pool(&config.database_url, 8).context("Failed to open the database")?;

    let whitelist = Arc::new(WhitelistRepository::new(pool.clone()));
    let seeded = whitelist
        .seed(&config.telegram_chat_ids, Utc::now().timestamp())
        .context("Failed to seed the bot whitelist")?;
    if seeded > 0 {
        info!("Seeded bot whitelist with {} chat ids", seeded);
    }
    if config.telegram_bot_token.is_none() || whitelist.chat_ids().context("Failed to read the bot whitelist")?.is_empty() {
        warn!("TELEGRAM_BOT_TOKEN or whitelisted chats missing, lead notifications are off");
    }

    let state = Arc::new(AppState {
        lead_repository: Arc::new(LeadRepository::new(pool.clone())),
        metrics_repository: Arc::new(MetricsRepository::new(pool)),
        handle_resolver: Arc::new(BotApiResolver::new(config.telegram_bot_token.as_deref())),
        lead_notifier: Arc::new(TelegramLeadNotifier::from_config(&config, whitelist.clone())),
        whitelist_repository: whitelist,
        config,
    });

    let bind_addr = state.config.bind_addr.clone();
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

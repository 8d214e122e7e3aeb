use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use logo_bot::bot::{self, BotController, TelegramTransport};
use logo_bot::composition::CompositionEngine;
use logo_bot::config::BotConfig;
use logo_bot::controller::SessionController;
use logo_bot::db::PgSessionStore;
use logo_bot::fonts::FontCatalog;
use logo_bot::photo_storage::PhotoStorage;
use logo_bot::session_store::{InMemorySessionStore, SessionBackend};

/// How often idle sessions are swept when a TTL is configured
const EVICTION_INTERVAL_SECS: u64 = 60;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,teloxide=info,sqlx=warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();
    info!("Starting Logo Telegram Bot");

    let config = BotConfig::from_env().context("Failed to load configuration")?;

    let backend = match &config.database_url {
        Some(url) => {
            info!("Using PostgreSQL session store");
            SessionBackend::Postgres(PgSessionStore::connect(url).await?)
        }
        None => {
            info!("DATABASE_URL not set, using in-memory session store");
            SessionBackend::Memory(InMemorySessionStore::new())
        }
    };

    let fonts = Arc::new(FontCatalog::new(&config.fonts_dir, config.fonts.clone()));
    // Fail at startup rather than on the first render
    fonts
        .load(&config.default_font)
        .with_context(|| {
            format!("Failed to load default font from {}", config.fonts_dir.display())
        })?;

    let engine = CompositionEngine::new(
        fonts,
        config.render.placement(),
        config.render.engine_options(),
    );

    let bot = Bot::new(&config.bot_token);
    let controller: Arc<BotController> = Arc::new(SessionController::new(
        backend,
        TelegramTransport::new(bot.clone()),
        engine,
        PhotoStorage::new(&config.photos_dir),
        config.controller_config(),
    ));

    info!(
        store = controller.store().name(),
        photos_dir = %config.photos_dir.display(),
        region_detection = config.render.region_detection,
        "Bot initialized"
    );

    if config.session_ttl_minutes > 0 {
        let ttl = chrono::Duration::minutes(config.session_ttl_minutes as i64);
        let sweeper = Arc::clone(&controller);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(EVICTION_INTERVAL_SECS));
            loop {
                ticker.tick().await;
                if let Err(e) = sweeper.evict_idle(ttl).await {
                    error!(error = %e, "Failed to evict idle sessions");
                }
            }
        });
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(bot::message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}

//! # King Says Bot Main Entry Point
//!
//! Initializes logging, loads configuration and placeholder dictionaries,
//! sets up the database, and runs the Telegram bot next to the HTTP server.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tower_http::trace::TraceLayer;

use king_says_bot::bot::handlers::BotHandler;
use king_says_bot::bot::transport::TelegramTransport;
use king_says_bot::bot::BotContext;
use king_says_bot::config::Config;
use king_says_bot::database::connection::DatabaseManager;
use king_says_bot::database::GameStore;
use king_says_bot::game::{CommandBroadcaster, PlaceholderConfig, PlaceholderMatcher};
use king_says_bot::services::health::HealthService;
use king_says_bot::services::web::WebService;
use king_says_bot::utils::fatal::FatalSignal;
use king_says_bot::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "king_says_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    info!("Starting King Says Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Placeholders: {}",
        config.database_url, config.http_port, config.placeholders_path
    );

    let placeholders = PlaceholderConfig::from_file(&config.placeholders_path)?;
    let matcher = Arc::new(
        PlaceholderMatcher::new(&placeholders)
            .map_err(|e| anyhow::anyhow!("Failed to build placeholder matcher: {}", e))?,
    );

    // Initialize database
    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    let store = GameStore::new(&db_manager);
    info!("Database initialized successfully");

    // Initialize bot
    info!("Initializing Telegram bot...");
    let bot = Bot::new(&config.telegram_bot_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let broadcaster = CommandBroadcaster::new(
        store.clone(),
        matcher,
        transport,
        config.web_message_capacity,
    );
    let fatal = FatalSignal::new();
    let handler = BotHandler::new(BotContext {
        broadcaster,
        config: config.clone(),
        fatal: fatal.clone(),
    });
    info!("Telegram bot initialized successfully");

    let router = HealthService::new(store.clone())
        .router
        .merge(WebService::new(store.clone(), fatal.clone()).router)
        .layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("HTTP server starting on port {}", config.http_port);

    // Run both the bot and the HTTP server concurrently
    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let http_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    // Wait for either task to complete or a fatal error to be raised
    let mut fatal_reason = None;
    tokio::select! {
        reason = fatal.wait() => {
            fatal_reason = Some(reason);
        }
        result1 = bot_task => {
            if let Err(e) = result1 {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result2 = http_task => {
            if let Err(e) = result2 {
                tracing::error!("HTTP task error: {}", e);
            }
        }
    }

    store.close().await;
    log_system_event("shutdown", Some("database closed"));

    if let Some(reason) = fatal_reason {
        return Err(anyhow::anyhow!("Stopped after fatal error: {}", reason));
    }
    info!("Application stopped");
    Ok(())
}

/// Telegram command definitions and their implementations
pub mod commands;
/// Update routing into the command handlers
pub mod handlers;
/// Delivery of messages to chat players
pub mod transport;

use std::sync::Arc;
use teloxide::RequestError;
use thiserror::Error;

use crate::config::Config;
use crate::game::{CommandBroadcaster, GameError};
use crate::utils::fatal::FatalSignal;

/// Everything a command handler needs.
#[derive(Clone)]
pub struct BotContext {
    pub broadcaster: CommandBroadcaster,
    pub config: Arc<Config>,
    pub fatal: FatalSignal,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("telegram error: {0}")]
    Telegram(#[from] RequestError),
}

impl From<sqlx::Error> for HandlerError {
    fn from(error: sqlx::Error) -> Self {
        HandlerError::Game(GameError::Storage(error))
    }
}

pub mod game_round;
pub mod session_management;
pub mod settings;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

use crate::bot::{BotContext, HandlerError};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "The King Says bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Create a new game session")]
    Create,
    #[command(description = "Join a game by its id")]
    Join(String),
    #[command(description = "Leave the current game")]
    Leave,
    #[command(description = "Show the current game")]
    Session,
    #[command(description = "Set your name")]
    Name(String),
    #[command(description = "Set your gender: female, male, both or none")]
    Gender(String),
    #[command(description = "Suggest a command for the game")]
    Suggest(String),
    #[command(description = "Reveal a random suggested command")]
    Reveal,
    #[command(description = "Send a command to all players")]
    Say(String),
    #[command(description = "Show where the placeholders of a command are")]
    Preview(String),
    #[command(description = "Give every player a secret number")]
    Numbers,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Start => "start",
            Command::Create => "create",
            Command::Join(_) => "join",
            Command::Leave => "leave",
            Command::Session => "session",
            Command::Name(_) => "name",
            Command::Gender(_) => "gender",
            Command::Suggest(_) => "suggest",
            Command::Reveal => "reveal",
            Command::Say(_) => "say",
            Command::Preview(_) => "preview",
            Command::Numbers => "numbers",
        }
    }
}

/// The player behind the chat, registered on first contact.
pub(crate) async fn current_user(msg: &Message, ctx: &BotContext) -> Result<i64, HandlerError> {
    let language = msg
        .from()
        .and_then(|user| user.language_code.clone())
        .unwrap_or_else(|| "en".to_string());
    let name = msg
        .from()
        .map(|user| user.first_name.clone())
        .unwrap_or_else(|| "Player".to_string());
    let name: String = name.chars().take(crate::utils::validation::MAX_NAME_LENGTH).collect();

    Ok(ctx
        .broadcaster
        .store()
        .get_or_create_telegram_user(msg.chat.id.0, &language, &name)
        .await?)
}

pub(crate) async fn reply(bot: &Bot, msg: &Message, text: impl Into<String>) -> Result<(), HandlerError> {
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub(crate) const NOT_IN_SESSION: &str = "❌ You are not in a game. Use /create or /join first.";

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::HandlerResult;
use crate::bot::commands::{game_round, session_management, settings, Command};
use crate::bot::{BotContext, HandlerError};
use crate::utils::logging::{log_command_error, log_command_start, log_command_success};

pub async fn command_handler(bot: Bot, msg: Message, cmd: Command, ctx: BotContext) -> HandlerResult {
    let name = cmd.name();
    let user = msg
        .from()
        .map(|user| user.username.clone().unwrap_or_else(|| user.first_name.clone()))
        .unwrap_or_else(|| "unknown".to_string());
    let user_id = msg.from().map(|user| user.id.0 as i64).unwrap_or(0);
    let chat_id = msg.chat.id.0;

    log_command_start(name, &user, user_id, chat_id, None);

    let result = match cmd {
        Command::Help => bot
            .send_message(msg.chat.id, Command::descriptions().to_string())
            .await
            .map(|_| ())
            .map_err(HandlerError::from),
        Command::Start => session_management::handle_start(bot, msg, &ctx).await,
        Command::Create => session_management::handle_create(bot, msg, &ctx).await,
        Command::Join(token) => session_management::handle_join(bot, msg, token, &ctx).await,
        Command::Leave => session_management::handle_leave(bot, msg, &ctx).await,
        Command::Session => session_management::handle_session(bot, msg, &ctx).await,
        Command::Name(value) => settings::handle_name(bot, msg, value, &ctx).await,
        Command::Gender(value) => settings::handle_gender(bot, msg, value, &ctx).await,
        Command::Suggest(text) => game_round::handle_suggest(bot, msg, text, &ctx).await,
        Command::Reveal => game_round::handle_reveal(bot, msg, &ctx).await,
        Command::Say(text) => game_round::handle_say(bot, msg, text, &ctx).await,
        Command::Preview(text) => game_round::handle_preview(bot, msg, text, &ctx).await,
        Command::Numbers => game_round::handle_numbers(bot, msg, &ctx).await,
    };

    match result {
        Ok(()) => {
            log_command_success(name, user_id, chat_id, None);
            Ok(())
        }
        Err(HandlerError::Game(e)) if e.is_fatal() => {
            log_command_error(name, user_id, chat_id, &e.to_string());
            ctx.fatal.raise(&format!("bot /{name}"), &e.to_string());
            Err(Box::new(HandlerError::Game(e)))
        }
        Err(e) => {
            log_command_error(name, user_id, chat_id, &e.to_string());
            Err(Box::new(e))
        }
    }
}

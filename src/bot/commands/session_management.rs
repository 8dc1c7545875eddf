use teloxide::prelude::*;

use super::{current_user, reply, NOT_IN_SESSION};
use crate::bot::{BotContext, HandlerError};
use crate::database::models::{LeaveOutcome, ParticipantAddress};
use crate::utils::logging::log_delivery_failure;
use crate::utils::markup::escape_html;
use crate::utils::validation::{gender_label, validate_session_token};

pub async fn handle_start(bot: Bot, msg: Message, ctx: &BotContext) -> Result<(), HandlerError> {
    let user_id = current_user(&msg, ctx).await?;
    let store = ctx.broadcaster.store();
    if let Some(language) = msg.from().and_then(|user| user.language_code.as_deref()) {
        store.set_user_language(user_id, language).await?;
    }
    let completed = store
        .telegram_user(user_id)
        .await?
        .map(|user| user.ftue_completed)
        .unwrap_or(false);

    let mut text = String::from(
        "👑 Welcome to The King Says!\n\n\
        One player creates a game with /create, the others /join it.\n\
        Suggest commands with /suggest, reveal them with /reveal and the bot \
        fills in who has to do what.",
    );
    if !completed {
        text.push_str("\n\nFirst tell me who you are: /name <i>your name</i>, then /gender female|male|both|none.");
    }
    reply(&bot, &msg, text).await
}

pub async fn handle_create(bot: Bot, msg: Message, ctx: &BotContext) -> Result<(), HandlerError> {
    let user_id = current_user(&msg, ctx).await?;
    let store = ctx.broadcaster.store();

    let change = store.create_session(user_id).await?;
    let token = store
        .token_from_session_id(change.session_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let mut text = format!(
        "✅ <b>Game created!</b>\n\n🎟 Game id: <code>{token}</code>\nOthers can join with /join {token}"
    );
    if let Some(link) = ctx.config.invite_link(&token) {
        text.push_str(&format!("\n🌐 Or on the web: {link}"));
    }
    text.push_str(&previous_session_note(change.previous));
    reply(&bot, &msg, text).await?;

    if let Some(previous) = change.previous {
        refresh_session_messages(ctx, previous.session_id).await?;
    }
    Ok(())
}

pub async fn handle_join(bot: Bot, msg: Message, token: String, ctx: &BotContext) -> Result<(), HandlerError> {
    let token = match validate_session_token(&token) {
        Ok(token) => token,
        Err(e) => return reply(&bot, &msg, format!("❌ {e}")).await,
    };

    let user_id = current_user(&msg, ctx).await?;
    let store = ctx.broadcaster.store();

    let Some(session_id) = store.session_id_from_token(&token).await? else {
        return reply(&bot, &msg, "❌ Game not found. Did the host delete it?").await;
    };

    let Some(change) = store.join_session(user_id, session_id).await? else {
        return reply(&bot, &msg, "❌ Game not found. Did the host delete it?").await;
    };

    let players = store.participant_count(change.session_id, false).await?;
    let text = format!(
        "✅ You joined the game. Players: {players}{}",
        previous_session_note(change.previous)
    );
    reply(&bot, &msg, text).await?;

    refresh_session_messages(ctx, change.session_id).await?;
    if let Some(previous) = change.previous {
        refresh_session_messages(ctx, previous.session_id).await?;
    }
    Ok(())
}

pub async fn handle_leave(bot: Bot, msg: Message, ctx: &BotContext) -> Result<(), HandlerError> {
    let user_id = current_user(&msg, ctx).await?;

    let store = ctx.broadcaster.store();
    store.set_session_message_id(user_id, None).await?;

    match store.leave_session(user_id).await? {
        Some(outcome) if outcome.session_deleted => {
            reply(&bot, &msg, "👋 You left the game. It had no other players and was closed.").await
        }
        Some(outcome) => {
            reply(&bot, &msg, "👋 You left the game.").await?;
            refresh_session_messages(ctx, outcome.session_id).await
        }
        None => reply(&bot, &msg, NOT_IN_SESSION).await,
    }
}

pub async fn handle_session(bot: Bot, msg: Message, ctx: &BotContext) -> Result<(), HandlerError> {
    let user_id = current_user(&msg, ctx).await?;
    let store = ctx.broadcaster.store();

    let Some(session_id) = store.user_session(user_id).await? else {
        return reply(&bot, &msg, NOT_IN_SESSION).await;
    };

    let text = session_status(ctx, session_id).await?;
    let message_id = match ctx.broadcaster.transport().send_message(msg.chat.id.0, &text, None).await {
        Ok(message_id) => message_id,
        Err(e) => {
            log_delivery_failure(&format!("chat {}", msg.chat.id.0), &e.to_string());
            return Ok(());
        }
    };
    store.set_session_message_id(user_id, Some(i64::from(message_id))).await?;
    Ok(())
}

/// Rewrites the status message every chat player last asked for with /session.
pub(crate) async fn refresh_session_messages(ctx: &BotContext, session_id: i64) -> Result<(), HandlerError> {
    let store = ctx.broadcaster.store();
    if !store.session_exists(session_id).await? {
        return Ok(());
    }
    let text = session_status(ctx, session_id).await?;

    for player in store.participant_views(session_id).await? {
        let ParticipantAddress::Chat(chat_id) = player.address else {
            continue;
        };
        let message_id = store
            .telegram_user(player.user_id)
            .await?
            .and_then(|user| user.current_session_message)
            .and_then(|id| i32::try_from(id).ok());
        let Some(message_id) = message_id else {
            continue;
        };
        if let Err(e) = ctx
            .broadcaster
            .transport()
            .send_message(chat_id, &text, Some(message_id))
            .await
        {
            // old or deleted status messages cannot be edited any more
            log_delivery_failure(&format!("chat {chat_id}"), &e.to_string());
            store.set_session_message_id(player.user_id, None).await?;
        }
    }
    Ok(())
}

async fn session_status(ctx: &BotContext, session_id: i64) -> Result<String, HandlerError> {
    let store = ctx.broadcaster.store();
    let token = store.token_from_session_id(session_id).await?.unwrap_or_default();
    let players = store.participant_views(session_id).await?;
    let chat_players = store.participant_count(session_id, true).await?;
    let suggestions = store.suggestion_count(session_id).await?;

    let mut text = format!(
        "🎲 <b>Game {token}</b>\n\n💡 Suggested commands: {suggestions}\n👥 Players: {} ({chat_players} in Telegram)",
        players.len()
    );
    for player in &players {
        let origin = match player.address {
            ParticipantAddress::Chat(_) => "",
            ParticipantAddress::Web(_) => " 🌐",
        };
        text.push_str(&format!(
            "\n• {} ({}){origin}",
            escape_html(&player.name),
            gender_label(player.gender)
        ));
    }
    Ok(text)
}

fn previous_session_note(previous: Option<LeaveOutcome>) -> String {
    match previous {
        Some(outcome) if outcome.session_deleted => "\n\nYour previous game was closed.".to_string(),
        Some(_) => "\n\nYou left your previous game.".to_string(),
        None => String::new(),
    }
}

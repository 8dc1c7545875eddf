use teloxide::prelude::*;

use super::{current_user, reply, NOT_IN_SESSION};
use crate::bot::{BotContext, HandlerError};
use crate::game::PlaceholderKind;
use crate::utils::markup::escape_html;
use crate::utils::validation::validate_command_text;

async fn current_session(msg: &Message, ctx: &BotContext) -> Result<Option<i64>, HandlerError> {
    let user_id = current_user(msg, ctx).await?;
    Ok(ctx.broadcaster.store().user_session(user_id).await?)
}

pub async fn handle_suggest(bot: Bot, msg: Message, text: String, ctx: &BotContext) -> Result<(), HandlerError> {
    let text = match validate_command_text(&text) {
        Ok(text) => text,
        Err(e) => return reply(&bot, &msg, format!("❌ {e}")).await,
    };
    let Some(session_id) = current_session(&msg, ctx).await? else {
        return reply(&bot, &msg, NOT_IN_SESSION).await;
    };

    let store = ctx.broadcaster.store();
    store.enqueue_suggestion(session_id, &text).await?;
    let queued = store.suggestion_count(session_id).await?;

    reply(&bot, &msg, format!("💡 Suggestion added. Commands waiting: {queued}")).await
}

pub async fn handle_reveal(bot: Bot, msg: Message, ctx: &BotContext) -> Result<(), HandlerError> {
    let Some(session_id) = current_session(&msg, ctx).await? else {
        return reply(&bot, &msg, NOT_IN_SESSION).await;
    };

    if ctx.broadcaster.reveal_suggestion(session_id).await?.is_none() {
        return reply(&bot, &msg, "🤷 No suggested commands left. Add one with /suggest").await;
    }
    Ok(())
}

pub async fn handle_say(bot: Bot, msg: Message, text: String, ctx: &BotContext) -> Result<(), HandlerError> {
    let text = match validate_command_text(&text) {
        Ok(text) => text,
        Err(e) => return reply(&bot, &msg, format!("❌ {e}")).await,
    };
    let Some(session_id) = current_session(&msg, ctx).await? else {
        return reply(&bot, &msg, NOT_IN_SESSION).await;
    };

    ctx.broadcaster.broadcast(session_id, &text).await?;
    Ok(())
}

pub async fn handle_preview(bot: Bot, msg: Message, text: String, ctx: &BotContext) -> Result<(), HandlerError> {
    let text = match validate_command_text(&text) {
        Ok(text) => text,
        Err(e) => return reply(&bot, &msg, format!("❌ {e}")).await,
    };

    let preview = ctx.broadcaster.preview(&text, |kind| {
        match kind {
            PlaceholderKind::Female => "girl",
            PlaceholderKind::Male => "boy",
            PlaceholderKind::Any => "anyone",
        }
        .to_string()
    });
    reply(&bot, &msg, format!("👀 {}", escape_html(&preview))).await
}

pub async fn handle_numbers(bot: Bot, msg: Message, ctx: &BotContext) -> Result<(), HandlerError> {
    let Some(session_id) = current_session(&msg, ctx).await? else {
        return reply(&bot, &msg, NOT_IN_SESSION).await;
    };

    if ctx.broadcaster.give_numbers(session_id).await? == 0 {
        return reply(&bot, &msg, "🤷 Nobody in the game has set a gender yet.").await;
    }
    Ok(())
}

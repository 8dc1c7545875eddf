use teloxide::prelude::*;

use super::{current_user, reply};
use crate::bot::{BotContext, HandlerError};
use crate::utils::logging::log_validation_error;
use crate::utils::markup::escape_html;
use crate::utils::validation::{gender_label, parse_gender_name, validate_player_name};

pub async fn handle_name(bot: Bot, msg: Message, name: String, ctx: &BotContext) -> Result<(), HandlerError> {
    let name = match validate_player_name(&name) {
        Ok(name) => name,
        Err(e) => {
            log_validation_error("name", "name", &name, &e.to_string());
            return reply(&bot, &msg, format!("❌ {e}")).await;
        }
    };

    let user_id = current_user(&msg, ctx).await?;
    ctx.broadcaster.store().set_user_name(user_id, &name).await?;

    reply(&bot, &msg, format!("✅ Your name is now <b>{}</b>", escape_html(&name))).await
}

pub async fn handle_gender(bot: Bot, msg: Message, value: String, ctx: &BotContext) -> Result<(), HandlerError> {
    let gender = match parse_gender_name(&value) {
        Ok(gender) => gender,
        Err(e) => {
            log_validation_error("gender", "gender", &value, &e.to_string());
            return reply(&bot, &msg, format!("❌ {e}")).await;
        }
    };

    let user_id = current_user(&msg, ctx).await?;
    let store = ctx.broadcaster.store();
    store.set_user_gender(user_id, gender).await?;
    // gender is the last onboarding step
    store.set_user_completed_ftue(user_id, true).await?;

    reply(&bot, &msg, format!("✅ Gender set to <b>{}</b>", gender_label(gender))).await
}

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};

/// Delivers text to chat players.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `text` to `chat_id`, or edits `replace_message_id` in place.
    /// Returns the id of the message that now shows the text.
    async fn send_message(&self, chat_id: i64, text: &str, replace_message_id: Option<i32>) -> Result<i32>;
}

/// Telegram delivery with HTML parse mode, so `<b>` renders as bold.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, chat_id: i64, text: &str, replace_message_id: Option<i32>) -> Result<i32> {
        let message = match replace_message_id {
            Some(message_id) => {
                self.bot
                    .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
                    .parse_mode(ParseMode::Html)
                    .await?
            }
            None => {
                self.bot
                    .send_message(ChatId(chat_id), text)
                    .parse_mode(ParseMode::Html)
                    .await?
            }
        };
        Ok(message.id.0)
    }
}

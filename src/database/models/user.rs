use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::game::Gender;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub gender: i64,
    pub current_session: Option<i64>,
    pub current_session_idle_count: i64, // rounds not picked in a row
}

impl User {
    pub fn gender(&self) -> Gender {
        Gender::from_bits(self.gender)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub language: String,
    pub ftue_completed: bool,
    pub current_session_message: Option<i64>,
}

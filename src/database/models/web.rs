use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebUser {
    pub id: i64,
    pub user_id: i64,
    pub token: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebMessage {
    pub index_for_user: i64,
    pub message: String,
}

/// New backlog entries for a web player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePoll {
    pub messages: Vec<String>,
    /// Pass back as `since` on the next poll.
    pub last_index: i64,
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::game::Gender;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub token: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SuggestedCommand {
    pub id: i64,
    pub session_id: i64,
    pub command: String,
}

/// Where a participant receives broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantAddress {
    /// Telegram chat; these players keep the session alive.
    Chat(i64),
    /// Web page identified by its join token; messages go to the backlog.
    Web(i64),
}

/// A player of a session as needed to compose a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParticipant {
    pub user_id: i64,
    pub address: ParticipantAddress,
    pub name: String,
    pub gender: Gender,
    pub idle_count: i64,
}

impl SessionParticipant {
    pub fn is_web(&self) -> bool {
        matches!(self.address, ParticipantAddress::Web(_))
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ParticipantRow {
    pub user_id: i64,
    pub chat_id: i64,
    pub name: String,
    pub gender: i64,
    pub idle_count: i64,
    pub is_web: i64,
}

impl From<ParticipantRow> for SessionParticipant {
    fn from(row: ParticipantRow) -> Self {
        let address = if row.is_web != 0 {
            ParticipantAddress::Web(row.chat_id)
        } else {
            ParticipantAddress::Chat(row.chat_id)
        };
        Self {
            user_id: row.user_id,
            address,
            name: row.name,
            gender: Gender::from_bits(row.gender),
            idle_count: row.idle_count,
        }
    }
}

/// Result of a user leaving their session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// The session that was left.
    pub session_id: i64,
    /// True if the user was the last chat player and the session is gone.
    pub session_deleted: bool,
}

/// Result of creating or joining a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChange {
    /// The session the user is in now.
    pub session_id: i64,
    /// The session the user had to leave first, if any.
    pub previous: Option<LeaveOutcome>,
}

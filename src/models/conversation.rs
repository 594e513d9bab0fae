use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::message::MessageId;
use super::user::UserId;

/// Per-counterparty message statistics, straight from the message store
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ConversationStats {
    pub counterparty_id: UserId,
    pub last_message_id: MessageId,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: i64,
}

/// One row of a user's conversation list.
///
/// `last_message` and `last_message_time` are `None` for conversations seeded
/// from order history that have no message yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: UserId,
    pub display_name: String,
    pub avatar: Option<String>,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub unread_count: i64,
    #[serde(skip)]
    pub last_message_id: Option<MessageId>,
}

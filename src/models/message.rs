use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::user::{UserId, UserProfile};

pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    /// Thread ordering key; `id` breaks ties between same-timestamp inserts
    pub fn thread_order(&self) -> (DateTime<Utc>, MessageId) {
        (self.created_at, self.id)
    }

    /// Whether the pair (a, b) took part in this message, in either direction
    pub fn involves_pair(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b) || (self.sender_id == b && self.receiver_id == a)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[serde(alias = "receiver_id")]
    pub counterparty_id: UserId,
    #[validate(length(max = 5000, message = "Message is too long"))]
    pub body: String,
}

impl SendMessageRequest {
    /// Surrounding whitespace never counts: not toward the length limit,
    /// not toward emptiness.
    pub fn trimmed(mut self) -> Self {
        let trimmed = self.body.trim();
        if trimmed.len() != self.body.len() {
            self.body = trimmed.to_string();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub body: String,
    pub sender_display_name: String,
    pub sender_avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl MessageResponse {
    pub fn new(message: Message, sender: &UserProfile) -> Self {
        Self::with_sender(message, sender.display_name().to_string(), sender.avatar.clone())
    }

    pub fn with_sender(message: Message, sender_display_name: String, sender_avatar: Option<String>) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            body: message.body,
            sender_display_name,
            sender_avatar,
            created_at: message.created_at,
            is_read: message.is_read,
        }
    }
}

/// Messaging Service
///
/// Validates and records sends, and serves thread fetches with their
/// read-marking side effect. Identity and role come from the session
/// collaborator; counterparties are resolved through the user directory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    middleware::error_handling::{AppError, Result, EMPTY_MESSAGE_ERROR},
    models::{Message, MessageResponse, UserId, UserProfile, UserRole},
    repositories::{MessageStore, UserDirectory},
};

const UNKNOWN_SENDER: &str = "Unknown";

pub struct MessagingService {
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
}

impl MessagingService {
    pub fn new(messages: Arc<dyn MessageStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { messages, users }
    }

    /// Append a message from `sender_id` to `receiver_id`.
    ///
    /// Rejects empty bodies, self-messaging and same-role pairs before
    /// anything touches the store.
    pub async fn send(&self, sender_id: UserId, receiver_id: UserId, body: &str) -> Result<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation(EMPTY_MESSAGE_ERROR.to_string()));
        }
        if sender_id == receiver_id {
            return Err(AppError::Validation("You cannot message yourself".to_string()));
        }

        let sender = self
            .users
            .find_user(sender_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::NotFound("Sender not found".to_string()))?;
        let receiver = self.active_user(receiver_id).await?;

        if !receiver.can_converse_with(sender.role) {
            return Err(AppError::Validation(format!(
                "A {} can only message a {}",
                sender.role,
                sender.role.opposite()
            )));
        }

        let message = self.messages.insert(sender_id, receiver_id, body).await?;

        tracing::info!(
            message_id = message.id,
            sender = sender_id,
            receiver = receiver_id,
            "Message sent"
        );

        Ok(message)
    }

    /// Thread between the caller and `counterparty_id`, oldest first.
    /// Opening a thread is reading it: incoming unread messages get marked.
    pub async fn list_thread(&self, self_id: UserId, self_role: UserRole, counterparty_id: UserId) -> Result<Vec<Message>> {
        self.counterparty(self_role, counterparty_id).await?;
        self.messages.list_thread(self_id, counterparty_id).await
    }

    /// Resolve `counterparty_id` to an active user of the role opposite to
    /// `self_role`
    pub async fn counterparty(&self, self_role: UserRole, counterparty_id: UserId) -> Result<UserProfile> {
        let counterparty = self.active_user(counterparty_id).await?;
        if !counterparty.can_converse_with(self_role) {
            return Err(AppError::NotFound(format!("No {} with that id", self_role.opposite())));
        }
        Ok(counterparty)
    }

    /// Attach sender display name and avatar to each message
    pub async fn to_responses(&self, messages: Vec<Message>) -> Result<Vec<MessageResponse>> {
        let mut sender_ids: Vec<UserId> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();

        let senders: HashMap<UserId, UserProfile> = self
            .users
            .find_users(&sender_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(messages
            .into_iter()
            .map(|m| match senders.get(&m.sender_id) {
                Some(sender) => MessageResponse::new(m, sender),
                None => MessageResponse::with_sender(m, UNKNOWN_SENDER.to_string(), None),
            })
            .collect())
    }

    async fn active_user(&self, id: UserId) -> Result<UserProfile> {
        self.users
            .find_user(id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

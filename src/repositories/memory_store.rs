/// In-memory marketplace store
///
/// Implements all three storage ports over a single lock so every operation
/// is atomic, mirroring the transactional behaviour of the Postgres
/// repositories. Used by the test suites and by `MESSAGING_STORE=memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::middleware::error_handling::{AppError, Result};
use crate::models::{ConversationStats, Message, MessageId, UserId, UserProfile, UserRole};
use crate::repositories::{MessageStore, OrderHistory, UserDirectory};

#[derive(Default)]
struct MarketplaceState {
    users: HashMap<UserId, UserProfile>,
    orders: Vec<(UserId, UserId)>,
    messages: Vec<Message>,
    next_message_id: MessageId,
    last_created_at: Option<DateTime<Utc>>,
}

impl MarketplaceState {
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_created_at = Some(stamp);
        stamp
    }

    fn is_eligible_sender(&self, sender_id: UserId, receiver_id: UserId) -> bool {
        match (self.users.get(&sender_id), self.users.get(&receiver_id)) {
            (Some(sender), Some(receiver)) => sender.is_active && sender.role != receiver.role,
            _ => false,
        }
    }
}

#[derive(Default)]
pub struct InMemoryMarketplace {
    state: RwLock<MarketplaceState>,
    unavailable: AtomicBool,
}

impl InMemoryMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, profile: UserProfile) {
        self.state.write().await.users.insert(profile.id, profile);
    }

    /// Convenience for seeding: an active user without business name or avatar
    pub async fn add_simple_user(&self, id: UserId, username: &str, role: UserRole) {
        self.add_user(UserProfile {
            id,
            username: username.to_string(),
            business_name: None,
            avatar: None,
            role,
            is_active: true,
        })
        .await;
    }

    pub async fn record_order(&self, customer_id: UserId, vendor_id: UserId) {
        self.state.write().await.orders.push((customer_id, vendor_id));
    }

    /// Seed a message as-is, keeping its id and timestamp (history restore)
    pub async fn import_message(&self, message: Message) {
        let mut state = self.state.write().await;
        state.next_message_id = state.next_message_id.max(message.id);
        state.last_created_at = state.last_created_at.max(Some(message.created_at));
        state.messages.push(message);
    }

    pub async fn set_active(&self, id: UserId, is_active: bool) {
        if let Some(user) = self.state.write().await.users.get_mut(&id) {
            user.is_active = is_active;
        }
    }

    /// Simulate a store outage: every subsequent call fails with a store error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryMarketplace {
    async fn insert(&self, sender_id: UserId, receiver_id: UserId, body: &str) -> Result<Message> {
        self.check_available()?;
        let mut state = self.state.write().await;

        state.next_message_id += 1;
        let message = Message {
            id: state.next_message_id,
            sender_id,
            receiver_id,
            body: body.to_string(),
            created_at: state.next_timestamp(),
            is_read: false,
        };
        state.messages.push(message.clone());

        Ok(message)
    }

    async fn list_thread(&self, self_id: UserId, counterparty_id: UserId) -> Result<Vec<Message>> {
        self.check_available()?;
        let mut state = self.state.write().await;

        let mut thread = Vec::new();
        for message in state.messages.iter_mut().filter(|m| m.involves_pair(self_id, counterparty_id)) {
            if message.receiver_id == self_id {
                message.is_read = true;
            }
            thread.push(message.clone());
        }
        thread.sort_by_key(Message::thread_order);

        Ok(thread)
    }

    async fn count_unread(&self, user_id: UserId) -> Result<i64> {
        self.check_available()?;
        let state = self.state.read().await;

        let count = state
            .messages
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
            .filter(|m| state.is_eligible_sender(m.sender_id, user_id))
            .count();

        Ok(count as i64)
    }

    async fn conversation_stats(&self, user_id: UserId) -> Result<Vec<ConversationStats>> {
        self.check_available()?;
        let state = self.state.read().await;

        let mut stats: HashMap<UserId, ConversationStats> = HashMap::new();
        for message in state.messages.iter() {
            let counterparty_id = if message.sender_id == user_id {
                message.receiver_id
            } else if message.receiver_id == user_id {
                message.sender_id
            } else {
                continue;
            };
            let unread = i64::from(message.receiver_id == user_id && !message.is_read);

            let entry = stats.entry(counterparty_id).or_insert_with(|| ConversationStats {
                counterparty_id,
                last_message_id: message.id,
                last_message: message.body.clone(),
                last_message_time: message.created_at,
                unread_count: 0,
            });
            entry.unread_count += unread;
            if message.thread_order() > (entry.last_message_time, entry.last_message_id) {
                entry.last_message_id = message.id;
                entry.last_message = message.body.clone();
                entry.last_message_time = message.created_at;
            }
        }

        Ok(stats.into_values().collect())
    }
}

#[async_trait]
impl UserDirectory for InMemoryMarketplace {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>> {
        self.check_available()?;
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<UserProfile>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl OrderHistory for InMemoryMarketplace {
    async fn counterparties(&self, user_id: UserId, role: UserRole) -> Result<Vec<UserId>> {
        self.check_available()?;
        let state = self.state.read().await;

        let ids: BTreeSet<UserId> = state
            .orders
            .iter()
            .filter_map(|&(customer_id, vendor_id)| match role {
                UserRole::Customer if customer_id == user_id => Some(vendor_id),
                UserRole::Vendor if vendor_id == user_id => Some(customer_id),
                _ => None,
            })
            .collect();

        Ok(ids.into_iter().collect())
    }
}

/// Conversation Aggregator
///
/// Derives a user's conversation list on demand from message rows plus
/// order history:
/// - counterparties from any message involving the user
/// - counterparties the user has ordered from / sold to (seeded, no message)
/// - filtered to active users of the opposite role
/// - most recent conversation first, seeded conversations last

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    middleware::error_handling::Result,
    models::{ConversationStats, ConversationSummary, UserId, UserProfile, UserRole},
    repositories::{MessageStore, OrderHistory, UserDirectory},
};

pub struct ConversationService {
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
    orders: Arc<dyn OrderHistory>,
}

impl ConversationService {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        orders: Arc<dyn OrderHistory>,
    ) -> Self {
        Self { messages, users, orders }
    }

    pub async fn list_conversations(&self, self_id: UserId, self_role: UserRole) -> Result<Vec<ConversationSummary>> {
        let (stats, ordered_with) = tokio::try_join!(
            self.messages.conversation_stats(self_id),
            self.orders.counterparties(self_id, self_role),
        )?;

        let mut stats: HashMap<UserId, ConversationStats> =
            stats.into_iter().map(|s| (s.counterparty_id, s)).collect();

        let candidates: BTreeSet<UserId> = stats
            .keys()
            .copied()
            .chain(ordered_with)
            .filter(|id| *id != self_id)
            .collect();
        let candidates: Vec<UserId> = candidates.into_iter().collect();

        let profiles = self.users.find_users(&candidates).await?;

        let mut conversations: Vec<ConversationSummary> = profiles
            .into_iter()
            .filter(|p| p.can_converse_with(self_role))
            .map(|profile| {
                let stats = stats.remove(&profile.id);
                summarize(profile, stats)
            })
            .collect();

        conversations.sort_by(compare_conversations);

        tracing::debug!(
            user = self_id,
            role = %self_role,
            conversations = conversations.len(),
            "Conversation list aggregated"
        );

        Ok(conversations)
    }
}

fn summarize(profile: UserProfile, stats: Option<ConversationStats>) -> ConversationSummary {
    let display_name = profile.display_name().to_string();
    match stats {
        Some(stats) => ConversationSummary {
            id: profile.id,
            display_name,
            avatar: profile.avatar,
            last_message: Some(stats.last_message),
            last_message_time: Some(stats.last_message_time),
            unread_count: stats.unread_count.max(0),
            last_message_id: Some(stats.last_message_id),
        },
        None => ConversationSummary {
            id: profile.id,
            display_name,
            avatar: profile.avatar,
            last_message: None,
            last_message_time: None,
            unread_count: 0,
            last_message_id: None,
        },
    }
}

/// Newest activity first; seeded conversations after all real ones, by name
fn compare_conversations(a: &ConversationSummary, b: &ConversationSummary) -> Ordering {
    match (a.last_message_time, b.last_message_time) {
        (Some(ta), Some(tb)) => tb.cmp(&ta).then_with(|| b.last_message_id.cmp(&a.last_message_id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id)),
    }
}

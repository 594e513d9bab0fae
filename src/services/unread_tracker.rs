use std::sync::Arc;

use crate::{middleware::error_handling::Result, models::UserId, repositories::MessageStore};

/// Cheap badge counter. Reads the same `is_read` flags the conversation list
/// sums, so the two never disagree; nothing is cached between requests.
pub struct UnreadTracker {
    messages: Arc<dyn MessageStore>,
}

impl UnreadTracker {
    pub fn new(messages: Arc<dyn MessageStore>) -> Self {
        Self { messages }
    }

    pub async fn count_unread(&self, user_id: UserId) -> Result<i64> {
        let count = self.messages.count_unread(user_id).await?;
        Ok(count.max(0))
    }
}

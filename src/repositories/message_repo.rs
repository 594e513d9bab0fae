use async_trait::async_trait;
use sqlx::PgPool;

use crate::middleware::error_handling::Result;
use crate::models::{ConversationStats, Message, UserId};

/// Append-only message persistence with a one-way read flag.
///
/// Implementations must apply every operation atomically: a failed call
/// leaves no half-written message and no partially marked thread.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message. `body` is already trimmed and validated.
    async fn insert(&self, sender_id: UserId, receiver_id: UserId, body: &str) -> Result<Message>;

    /// Full thread between two users, ascending by `(created_at, id)`.
    ///
    /// Marks read every returned message sent by `counterparty_id` to
    /// `self_id`; marking an already-read message is a no-op.
    async fn list_thread(&self, self_id: UserId, counterparty_id: UserId) -> Result<Vec<Message>>;

    /// Unread messages addressed to `user_id` whose sender is an active user
    /// of the opposite role.
    async fn count_unread(&self, user_id: UserId) -> Result<i64>;

    /// Latest message and unread count per counterparty of `user_id`
    async fn conversation_stats(&self, user_id: UserId) -> Result<Vec<ConversationStats>>;
}

pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert(&self, sender_id: UserId, receiver_id: UserId, body: &str) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, sender_id, receiver_id, body, created_at, is_read
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn list_thread(&self, self_id: UserId, counterparty_id: UserId) -> Result<Vec<Message>> {
        let mut tx = self.pool.begin().await?;

        let mut messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, body, created_at, is_read
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(self_id)
        .bind(counterparty_id)
        .fetch_all(&mut *tx)
        .await?;

        // Only the rows the caller is about to see; anything committed after
        // the SELECT stays unread until the next fetch.
        let unread: Vec<i64> = messages
            .iter()
            .filter(|m| m.receiver_id == self_id && m.sender_id == counterparty_id && !m.is_read)
            .map(|m| m.id)
            .collect();

        if !unread.is_empty() {
            let marked: Vec<i64> = sqlx::query_scalar(
                r#"
                UPDATE messages
                SET is_read = TRUE
                WHERE id = ANY($1) AND receiver_id = $2 AND is_read = FALSE
                RETURNING id
                "#,
            )
            .bind(&unread)
            .bind(self_id)
            .fetch_all(&mut *tx)
            .await?;

            tracing::debug!(
                reader = self_id,
                counterparty = counterparty_id,
                marked = marked.len(),
                "Thread marked read"
            );
        }

        tx.commit().await?;

        for message in messages.iter_mut().filter(|m| unread.contains(&m.id)) {
            message.is_read = true;
        }

        Ok(messages)
    }

    async fn count_unread(&self, user_id: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN users s ON s.id = m.sender_id
            JOIN users r ON r.id = m.receiver_id
            WHERE m.receiver_id = $1
              AND m.is_read = FALSE
              AND s.is_active = TRUE
              AND s.role <> r.role
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn conversation_stats(&self, user_id: UserId) -> Result<Vec<ConversationStats>> {
        let stats = sqlx::query_as::<_, ConversationStats>(
            r#"
            SELECT DISTINCT ON (t.counterparty_id)
                t.counterparty_id,
                t.id AS last_message_id,
                t.body AS last_message,
                t.created_at AS last_message_time,
                COALESCE(u.unread_count, 0) AS unread_count
            FROM (
                SELECT m.id, m.body, m.created_at,
                       CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END AS counterparty_id
                FROM messages m
                WHERE m.sender_id = $1 OR m.receiver_id = $1
            ) t
            LEFT JOIN (
                SELECT sender_id, COUNT(*) AS unread_count
                FROM messages
                WHERE receiver_id = $1 AND is_read = FALSE
                GROUP BY sender_id
            ) u ON u.sender_id = t.counterparty_id
            ORDER BY t.counterparty_id, t.created_at DESC, t.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }
}

// Run against a scratch database:
//   DATABASE_URL=postgres://... cargo test message_repo -- --ignored
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    async fn seed_users(pool: &PgPool) {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, role) VALUES
                (10, 'alice', 'customer'),
                (11, 'dave', 'customer'),
                (20, 'bobs_bakery', 'vendor')
            "#,
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn insert_at(pool: &PgPool, id: i64, sender_id: UserId, receiver_id: UserId, created_at: DateTime<Utc>) {
        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, body, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(format!("message {}", id))
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    #[sqlx::test]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_same_timestamp_thread_ordered_by_id(pool: PgPool) {
        seed_users(&pool).await;
        let repo = MessageRepository::new(pool.clone());
        let at = Utc::now();

        insert_at(&pool, 7, 10, 20, at).await;
        insert_at(&pool, 3, 20, 10, at).await;
        insert_at(&pool, 5, 10, 20, at - Duration::seconds(1)).await;

        let thread = repo.list_thread(10, 20).await.unwrap();
        assert_eq!(thread.iter().map(|m| m.id).collect::<Vec<_>>(), vec![5, 3, 7]);

        let stats = repo.conversation_stats(20).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].last_message_id, 7);
    }

    #[sqlx::test]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_list_thread_marks_returned_incoming_messages(pool: PgPool) {
        seed_users(&pool).await;
        let repo = MessageRepository::new(pool);

        repo.insert(10, 20, "Is this available?").await.unwrap();
        repo.insert(20, 10, "Yes, until Friday").await.unwrap();
        repo.insert(11, 20, "Other thread").await.unwrap();
        assert_eq!(repo.count_unread(20).await.unwrap(), 2);

        let thread = repo.list_thread(20, 10).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert!(thread.iter().filter(|m| m.receiver_id == 20).all(|m| m.is_read));

        assert_eq!(repo.count_unread(20).await.unwrap(), 1);
        assert_eq!(repo.count_unread(10).await.unwrap(), 1);

        // Idempotent
        repo.list_thread(20, 10).await.unwrap();
        assert_eq!(repo.count_unread(20).await.unwrap(), 1);
    }

    #[sqlx::test]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_unread_count_skips_inactive_and_same_role_senders(pool: PgPool) {
        seed_users(&pool).await;
        let repo = MessageRepository::new(pool.clone());

        repo.insert(10, 20, "from alice").await.unwrap();
        repo.insert(11, 20, "from dave").await.unwrap();
        assert_eq!(repo.count_unread(20).await.unwrap(), 2);

        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = 11")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(repo.count_unread(20).await.unwrap(), 1);

        sqlx::query("UPDATE users SET role = 'vendor' WHERE id = 10")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(repo.count_unread(20).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_conversation_stats_per_counterparty(pool: PgPool) {
        seed_users(&pool).await;
        let repo = MessageRepository::new(pool);

        repo.insert(10, 20, "a").await.unwrap();
        repo.insert(11, 20, "b").await.unwrap();
        repo.insert(11, 20, "c").await.unwrap();
        repo.insert(20, 10, "reply").await.unwrap();

        let mut stats = repo.conversation_stats(20).await.unwrap();
        stats.sort_by_key(|s| s.counterparty_id);

        assert_eq!(stats.len(), 2);
        assert_eq!((stats[0].counterparty_id, stats[0].last_message.as_str(), stats[0].unread_count), (10, "reply", 1));
        assert_eq!((stats[1].counterparty_id, stats[1].last_message.as_str(), stats[1].unread_count), (11, "c", 2));
    }
}

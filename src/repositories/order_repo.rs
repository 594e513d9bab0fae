use async_trait::async_trait;
use sqlx::PgPool;

use crate::middleware::error_handling::Result;
use crate::models::user::{UserId, UserRole};

/// Relationship predicate backed by the order history store
#[async_trait]
pub trait OrderHistory: Send + Sync {
    /// Distinct users `user_id` has transacted with, from the side of `role`
    async fn counterparties(&self, user_id: UserId, role: UserRole) -> Result<Vec<UserId>>;
}

pub struct OrderHistoryRepository {
    pool: PgPool,
}

impl OrderHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderHistory for OrderHistoryRepository {
    async fn counterparties(&self, user_id: UserId, role: UserRole) -> Result<Vec<UserId>> {
        let query = match role {
            UserRole::Customer => "SELECT DISTINCT vendor_id FROM orders WHERE customer_id = $1",
            UserRole::Vendor => "SELECT DISTINCT customer_id FROM orders WHERE vendor_id = $1",
        };

        let ids: Vec<i64> = sqlx::query_scalar(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}

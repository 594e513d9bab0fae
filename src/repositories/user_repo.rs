use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::middleware::error_handling::{AppError, Result};
use crate::models::user::{UserId, UserProfile, UserRow};

/// Read-only access to users owned by the authentication collaborator
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>>;

    /// Profiles for every id that resolves; unknown ids are skipped
    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<UserProfile>>;
}

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_profile(row: UserRow) -> Result<UserProfile> {
    let id = row.id;
    UserProfile::try_from(row).map_err(|e| AppError::Internal(anyhow!("User {} has an invalid role: {}", id, e)))
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, business_name, avatar, role, is_active
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_profile).transpose()
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<UserProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, business_name, avatar, role, is_active
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_profile).collect()
    }
}

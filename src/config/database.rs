use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use super::DatabaseConfig;

/// Connect to Postgres and bring the messaging schema up to date
pub async fn create_pool(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.connection_string())
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database connected, migrations applied");

    Ok(pool)
}

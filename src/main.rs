use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_messaging::config::{database::create_pool, AppConfig, AppState, StoreBackend};
use market_messaging::create_app;
use market_messaging::repositories::{
    InMemoryMarketplace, MessageRepository, OrderHistoryRepository, UserRepository,
};

fn init_tracing() {
    // INFO by default; RUST_LOG overrides for debugging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "market_messaging=info,tower_http=info,sqlx=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database).await?;
            Ok(AppState::new(
                config.jwt_secret.clone(),
                Arc::new(MessageRepository::new(pool.clone())),
                Arc::new(UserRepository::new(pool.clone())),
                Arc::new(OrderHistoryRepository::new(pool)),
            ))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory message store; messages are lost on restart");
            let store = Arc::new(InMemoryMarketplace::new());
            Ok(AppState::new(config.jwt_secret.clone(), store.clone(), store.clone(), store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let state = build_state(&config).await?;
    let app = create_app(state, &config.cors_origins);

    let addr = config.server_address();
    tracing::info!("Starting messaging server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

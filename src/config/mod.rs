pub mod database;
pub mod poller;

use std::env;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::repositories::{MessageStore, OrderHistory, UserDirectory};

pub use poller::PollerConfig;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub max_connections: u32,
    /// Full URL; takes precedence over the individual parts when set
    pub url: Option<String>,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("DATABASE_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse()?,
            username: env::var("DATABASE_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: env::var("DATABASE_PASSWORD").unwrap_or_default(),
            database: env::var("DATABASE_NAME").unwrap_or_else(|_| "marketplace".to_string()),
            ssl_mode: env::var("DATABASE_SSL_MODE").unwrap_or_else(|_| "prefer".to_string()),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            url: env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty()),
        })
    }

    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.username, self.password, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

/// Which message store backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => bail!("Unknown MESSAGING_STORE backend: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub store_backend: StoreBackend,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            store_backend: env::var("MESSAGING_STORE")
                .unwrap_or_else(|_| "postgres".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            cors_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Shared router state: the session secret plus the three storage ports
#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub messages: Arc<dyn MessageStore>,
    pub users: Arc<dyn UserDirectory>,
    pub orders: Arc<dyn OrderHistory>,
}

impl AppState {
    pub fn new(
        jwt_secret: impl Into<String>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        orders: Arc<dyn OrderHistory>,
    ) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            messages,
            users,
            orders,
        }
    }
}

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Badge-only refresh cadence when no messaging view is on screen
pub const DEFAULT_BADGE_INTERVAL: Duration = Duration::from_secs(30);
/// Cadence while the inbox or a thread is on screen
pub const DEFAULT_ACTIVE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);
const MIN_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub base_url: String,
    pub token: String,
    pub badge_interval: Duration,
    pub active_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            token: String::new(),
            badge_interval: DEFAULT_BADGE_INTERVAL,
            active_interval: DEFAULT_ACTIVE_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl PollerConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            base_url: env::var("MESSAGING_BASE_URL").unwrap_or(defaults.base_url),
            token: env::var("MESSAGING_TOKEN").context("MESSAGING_TOKEN must be set")?,
            badge_interval: secs_from_env("POLL_BADGE_INTERVAL_SECS", defaults.badge_interval)?,
            active_interval: secs_from_env("POLL_ACTIVE_INTERVAL_SECS", defaults.active_interval)?,
            request_timeout: secs_from_env("POLL_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
        })
    }
}

fn secs_from_env(key: &str, default: Duration) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) => {
            let secs: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", key))?;
            Ok(Duration::from_secs_f64(secs.max(0.0)).max(MIN_INTERVAL))
        }
        Err(_) => Ok(default),
    }
}

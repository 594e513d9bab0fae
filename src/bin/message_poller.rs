// Message poller
// Keeps a messaging session in sync with the server and logs new-message notifications
// Usage: cargo run --bin message-poller [counterparty_id]

use anyhow::{anyhow, Result};
use std::env;
use std::sync::Arc;

use market_messaging::client::{HttpMessagingApi, Poller, SurfaceMode, TracingNotifier};
use market_messaging::config::PollerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "market_messaging=info,message_poller=info".into()),
        ))
        .init();

    let config = PollerConfig::from_env()?;

    let counterparty = env::args()
        .nth(1)
        .map(|arg| arg.parse::<i64>().map_err(|_| anyhow!("counterparty id must be a number, got {}", arg)))
        .transpose()?;

    let api = Arc::new(HttpMessagingApi::new(&config)?);
    let mode = if counterparty.is_some() { SurfaceMode::Inbox } else { SurfaceMode::Badge };

    // A terminal is never "focused" in the browser sense: always notify
    let (handle, task) = Poller::new(api, Arc::new(TracingNotifier), &config, mode, false).spawn();

    if let Some(counterparty_id) = counterparty {
        tracing::info!("Opening thread with user {}", counterparty_id);
        handle.open_thread(counterparty_id);
    }

    let mut view = handle.view();
    let mut last_unread = None;
    let mut last_thread_len = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping message poller");
                handle.shutdown();
                break;
            }
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();

                if current.unread_count != last_unread {
                    tracing::info!("Unread messages: {}", current.unread_count.unwrap_or(0));
                    last_unread = current.unread_count;
                }

                if current.thread.len() > last_thread_len {
                    for message in &current.thread[last_thread_len..] {
                        tracing::info!(
                            "[{}] {}: {}",
                            message.created_at.format("%Y-%m-%d %H:%M"),
                            message.sender_display_name,
                            message.body
                        );
                    }
                }
                last_thread_len = current.thread.len();
            }
        }
    }

    task.await?;
    Ok(())
}

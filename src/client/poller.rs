//! Client Poller
//!
//! Cooperative polling loop for one client session. Each tick spawns the
//! fetches the [`SyncSession`] asks for; results come back over a channel and
//! are folded into the published [`ClientView`]. A failed or timed-out fetch
//! is logged and skipped; the next tick simply tries again. Fetches can
//! overlap, so each carries the sequence number it was issued with and the
//! session drops whatever arrives out of order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::api::{ClientError, MessagingApi};
use super::notifier::Notifier;
use super::sync::{Applied, ClientView, PollRequest, PollResponse, SurfaceMode, SyncSession};
use crate::config::PollerConfig;
use crate::middleware::error_handling::EMPTY_MESSAGE_ERROR;
use crate::models::{MessageResponse, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerCommand {
    OpenThread(UserId),
    CloseThread,
    SetFocused(bool),
    SetMode(SurfaceMode),
    /// Fetch everything due right away, outside the cadence
    RefreshNow,
    Shutdown,
}

struct PollOutcome {
    seq: u64,
    request: PollRequest,
    result: Result<PollResponse, ClientError>,
}

/// What a command did to the loop
enum CommandEffect {
    Continue,
    RestartCadence,
    Stop,
}

/// Control surface for a running poller
#[derive(Clone)]
pub struct PollerHandle {
    commands: mpsc::UnboundedSender<PollerCommand>,
    view: watch::Receiver<ClientView>,
    api: Arc<dyn MessagingApi>,
}

impl PollerHandle {
    fn command(&self, command: PollerCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Poller already stopped; command dropped");
        }
    }

    pub fn open_thread(&self, counterparty_id: UserId) {
        self.command(PollerCommand::OpenThread(counterparty_id));
    }

    pub fn close_thread(&self) {
        self.command(PollerCommand::CloseThread);
    }

    pub fn set_focused(&self, focused: bool) {
        self.command(PollerCommand::SetFocused(focused));
    }

    pub fn set_mode(&self, mode: SurfaceMode) {
        self.command(PollerCommand::SetMode(mode));
    }

    pub fn shutdown(&self) {
        self.command(PollerCommand::Shutdown);
    }

    pub fn view(&self) -> watch::Receiver<ClientView> {
        self.view.clone()
    }

    /// Send a message and refresh right away on success. On failure nothing
    /// is dropped silently: the error goes back to the caller, who still
    /// holds the text for resubmission.
    pub async fn send_message(&self, counterparty_id: UserId, body: &str) -> Result<MessageResponse, ClientError> {
        if body.trim().is_empty() {
            return Err(ClientError::Rejected {
                status: 400,
                message: EMPTY_MESSAGE_ERROR.to_string(),
            });
        }

        let message = self.api.send_message(counterparty_id, body).await?;
        self.command(PollerCommand::RefreshNow);
        Ok(message)
    }
}

pub struct Poller {
    api: Arc<dyn MessagingApi>,
    notifier: Arc<dyn Notifier>,
    session: SyncSession,
    request_timeout: Duration,
}

impl Poller {
    pub fn new(
        api: Arc<dyn MessagingApi>,
        notifier: Arc<dyn Notifier>,
        config: &PollerConfig,
        mode: SurfaceMode,
        focused: bool,
    ) -> Self {
        Self {
            api,
            notifier,
            session: SyncSession::new(mode, focused, config.badge_interval, config.active_interval),
            request_timeout: config.request_timeout,
        }
    }

    /// Start the loop on the current runtime
    pub fn spawn(self) -> (PollerHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(self.session.view().clone());

        let handle = PollerHandle {
            commands: commands_tx,
            view: view_rx,
            api: Arc::clone(&self.api),
        };
        let task = tokio::spawn(self.run(commands_rx, view_tx));

        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<PollerCommand>, view: watch::Sender<ClientView>) {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel::<PollOutcome>();

        // Initial load, then the regular cadence
        let due = self.session.due_requests();
        self.dispatch(due, &results_tx);
        let mut ticker = self.ticker();

        tracing::info!(
            mode = ?self.session.mode(),
            interval_secs = ticker.period().as_secs_f64(),
            "Message poller started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let due = self.session.due_requests();
                    self.dispatch(due, &results_tx);
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match self.handle_command(command, &results_tx) {
                        CommandEffect::Stop => break,
                        CommandEffect::RestartCadence => ticker = self.ticker(),
                        CommandEffect::Continue => {}
                    }
                    view.send_replace(self.session.view().clone());
                }
                Some(outcome) = results_rx.recv() => {
                    self.handle_outcome(outcome, &view);
                }
            }
        }

        tracing::info!("Message poller stopped");
    }

    fn handle_command(&mut self, command: PollerCommand, results: &mpsc::UnboundedSender<PollOutcome>) -> CommandEffect {
        let before = self.session.interval();
        let restart_if_changed = |after: Duration| {
            if before != after {
                CommandEffect::RestartCadence
            } else {
                CommandEffect::Continue
            }
        };

        match command {
            PollerCommand::OpenThread(counterparty_id) => {
                let immediate = self.session.open_thread(counterparty_id);
                self.dispatch(immediate, results);
                CommandEffect::RestartCadence
            }
            PollerCommand::CloseThread => {
                self.session.close_thread();
                restart_if_changed(self.session.interval())
            }
            PollerCommand::SetFocused(focused) => {
                self.session.set_focused(focused);
                CommandEffect::Continue
            }
            PollerCommand::SetMode(mode) => {
                self.session.set_mode(mode);
                restart_if_changed(self.session.interval())
            }
            PollerCommand::RefreshNow => {
                let due = self.session.due_requests();
                self.dispatch(due, results);
                CommandEffect::RestartCadence
            }
            PollerCommand::Shutdown => CommandEffect::Stop,
        }
    }

    fn handle_outcome(&mut self, outcome: PollOutcome, view: &watch::Sender<ClientView>) {
        let response = match outcome.result {
            Ok(response) => response,
            Err(e) => {
                // Keep the last-known view; the next tick tries again
                tracing::warn!(request = ?outcome.request, "Poll skipped: {}", e);
                return;
            }
        };

        match self.session.apply(outcome.seq, response) {
            Applied::Stale => {
                tracing::debug!(request = ?outcome.request, seq = outcome.seq, "Discarded stale poll response");
            }
            Applied::Updated { notification } => {
                if let Some(notification) = notification {
                    self.notifier.notify(&notification);
                }
                view.send_replace(self.session.view().clone());
            }
        }
    }

    fn ticker(&self) -> Interval {
        let period = self.session.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    fn dispatch(&mut self, requests: Vec<PollRequest>, results: &mpsc::UnboundedSender<PollOutcome>) {
        for request in requests {
            let seq = self.session.stamp();
            let api = Arc::clone(&self.api);
            let results = results.clone();
            let timeout = self.request_timeout;

            tokio::spawn(async move {
                let result = match tokio::time::timeout(timeout, fetch(api.as_ref(), request)).await {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::Timeout(timeout)),
                };
                let _ = results.send(PollOutcome { seq, request, result });
            });
        }
    }
}

async fn fetch(api: &dyn MessagingApi, request: PollRequest) -> Result<PollResponse, ClientError> {
    match request {
        PollRequest::UnreadCount => api.unread_count().await.map(PollResponse::UnreadCount),
        PollRequest::Conversations => api.conversations().await.map(PollResponse::Conversations),
        PollRequest::Thread(counterparty_id) => api.thread(counterparty_id).await.map(|messages| PollResponse::Thread {
            counterparty_id,
            messages,
        }),
    }
}

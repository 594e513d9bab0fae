//! Client-side synchronisation state.
//!
//! A [`SyncSession`] decides what to fetch on each tick, folds responses into
//! the last-known [`ClientView`], and applies the unread notification rule.
//! It does no I/O; the [`Poller`](super::poller::Poller) drives it.
//!
//! Fetches may overlap (a tick racing an immediate refresh), so every request
//! is stamped with a sequence number and a response older than the last one
//! applied for the same kind is dropped.

use std::collections::HashMap;
use std::time::Duration;

use crate::models::{ConversationSummary, MessageResponse, UserId};

/// What the client surface is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Only an unread badge is on screen
    Badge,
    /// The messaging view (conversation list, maybe a thread) is on screen
    Inbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    ThreadOpen(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollRequest {
    UnreadCount,
    Conversations,
    Thread(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollKind {
    UnreadCount,
    Conversations,
    Thread,
}

#[derive(Debug, Clone)]
pub enum PollResponse {
    UnreadCount(i64),
    Conversations(Vec<ConversationSummary>),
    Thread {
        counterparty_id: UserId,
        messages: Vec<MessageResponse>,
    },
}

/// Raised when unread messages arrive while the surface is not focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadNotification {
    pub delta: i64,
    pub unread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Updated { notification: Option<UnreadNotification> },
    /// Superseded by a newer response, or for a thread no longer open
    Stale,
}

/// Last-known state rendered by the client. Failed polls never clear it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientView {
    pub unread_count: Option<i64>,
    pub conversations: Vec<ConversationSummary>,
    pub open_thread: Option<UserId>,
    pub thread: Vec<MessageResponse>,
}

impl PollResponse {
    pub fn kind(&self) -> PollKind {
        match self {
            PollResponse::UnreadCount(_) => PollKind::UnreadCount,
            PollResponse::Conversations(_) => PollKind::Conversations,
            PollResponse::Thread { .. } => PollKind::Thread,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncSession {
    mode: SurfaceMode,
    state: SyncState,
    focused: bool,
    badge_interval: Duration,
    active_interval: Duration,
    last_observed: Option<i64>,
    watermark: Option<i64>,
    next_seq: u64,
    applied_seq: HashMap<PollKind, u64>,
    view: ClientView,
}

impl SyncSession {
    pub fn new(mode: SurfaceMode, focused: bool, badge_interval: Duration, active_interval: Duration) -> Self {
        Self {
            mode,
            state: SyncState::Idle,
            focused,
            badge_interval,
            active_interval,
            last_observed: None,
            watermark: None,
            next_seq: 0,
            applied_seq: HashMap::new(),
            view: ClientView::default(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn view(&self) -> &ClientView {
        &self.view
    }

    /// Poll cadence for the current state
    pub fn interval(&self) -> Duration {
        match (self.state, self.mode) {
            (SyncState::Idle, SurfaceMode::Badge) => self.badge_interval,
            _ => self.active_interval,
        }
    }

    /// Requests to issue on a scheduled tick
    pub fn due_requests(&self) -> Vec<PollRequest> {
        let mut requests = Vec::with_capacity(3);
        if let SyncState::ThreadOpen(counterparty_id) = self.state {
            requests.push(PollRequest::Thread(counterparty_id));
        }
        requests.push(PollRequest::UnreadCount);
        if self.mode == SurfaceMode::Inbox {
            requests.push(PollRequest::Conversations);
        }
        requests
    }

    /// Enter `ThreadOpen`; returns the immediate out-of-cadence fetch
    pub fn open_thread(&mut self, counterparty_id: UserId) -> Vec<PollRequest> {
        if self.view.open_thread != Some(counterparty_id) {
            self.view.thread.clear();
        }
        self.state = SyncState::ThreadOpen(counterparty_id);
        self.view.open_thread = Some(counterparty_id);
        vec![PollRequest::Thread(counterparty_id), PollRequest::UnreadCount]
    }

    pub fn close_thread(&mut self) {
        self.state = SyncState::Idle;
        self.view.open_thread = None;
        self.view.thread.clear();
    }

    pub fn set_mode(&mut self, mode: SurfaceMode) {
        self.mode = mode;
    }

    /// Focus resets the watermark: everything visible now counts as seen
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if focused {
            self.watermark = self.last_observed;
        }
    }

    /// Sequence number for a request about to be issued
    pub fn stamp(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Fold the response to the request stamped `seq` into the view
    pub fn apply(&mut self, seq: u64, response: PollResponse) -> Applied {
        let kind = response.kind();
        if self.applied_seq.get(&kind).is_some_and(|&last| seq <= last) {
            return Applied::Stale;
        }
        if let PollResponse::Thread { counterparty_id, .. } = &response {
            if self.state != SyncState::ThreadOpen(*counterparty_id) {
                return Applied::Stale;
            }
        }
        self.applied_seq.insert(kind, seq);

        match response {
            PollResponse::UnreadCount(count) => Applied::Updated {
                notification: self.observe_unread(count),
            },
            PollResponse::Conversations(conversations) => {
                self.view.conversations = conversations;
                Applied::Updated { notification: None }
            }
            PollResponse::Thread { messages, .. } => {
                self.view.thread = messages;
                Applied::Updated { notification: None }
            }
        }
    }

    fn observe_unread(&mut self, count: i64) -> Option<UnreadNotification> {
        let count = count.max(0);
        let previous = self.last_observed.replace(count);
        self.view.unread_count = Some(count);

        if self.focused {
            self.watermark = Some(count);
            return None;
        }

        // First observation of the session is the baseline, not news
        let watermark = match self.watermark {
            Some(watermark) => watermark,
            None => {
                self.watermark = Some(count);
                return None;
            }
        };

        match previous {
            Some(previous) if count > previous && count > watermark => {
                self.watermark = Some(count);
                Some(UnreadNotification {
                    delta: count - watermark,
                    unread_count: count,
                })
            }
            _ => None,
        }
    }
}

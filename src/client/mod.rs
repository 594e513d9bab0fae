//! Client side of the messaging sync protocol: periodic polling of the
//! messaging API with local unread notifications.

pub mod api;
pub mod notifier;
pub mod poller;
pub mod sync;

pub use api::{ClientError, HttpMessagingApi, MessagingApi};
pub use notifier::{Notifier, TracingNotifier};
pub use poller::{Poller, PollerCommand, PollerHandle};
pub use sync::{ClientView, SurfaceMode, SyncSession, SyncState, UnreadNotification};

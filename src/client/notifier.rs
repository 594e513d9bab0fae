use super::sync::UnreadNotification;

/// Local notification sink (desktop toast, terminal bell, log line...)
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &UnreadNotification);
}

/// Writes notifications to the log
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &UnreadNotification) {
        tracing::info!(
            new_messages = notification.delta,
            unread = notification.unread_count,
            "You have {} new message(s)",
            notification.delta
        );
    }
}

//! Best-effort fan-out of terminal message outcomes.

use tokio::sync::broadcast;

use crate::models::StatusUpdate;

/// Publishes status records to interested observers.
///
/// Delivery is best-effort: publishing never blocks and never fails the
/// pipeline operation that triggered it. Subscribers that fall behind lose
/// the oldest updates (broadcast channel semantics); a publish with no
/// subscribers is a no-op.
#[derive(Clone)]
pub struct StatusPublisher {
    tx: broadcast::Sender<StatusUpdate>,
}

impl StatusPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.tx.subscribe()
    }

    /// Publishes a status update; errors (no active subscribers) are
    /// deliberately dropped.
    pub fn publish(&self, update: StatusUpdate) {
        if self.tx.send(update).is_err() {
            tracing::trace!("status update published with no subscribers");
        }
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_updates() {
        let publisher = StatusPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.publish(StatusUpdate::success("key-1"));
        publisher.publish(StatusUpdate::failure("key-2", "mailbox unavailable"));

        let first = rx.recv().await.unwrap();
        assert_eq!(first, StatusUpdate::success("key-1"));
        let second = rx.recv().await.unwrap();
        assert!(!second.sent);
        assert_eq!(second.error.as_deref(), Some("mailbox unavailable"));
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let publisher = StatusPublisher::new(8);
        publisher.publish(StatusUpdate::success("key-1"));
    }
}

//! In-process notification fan-out.
//!
//! The durable notification row is always committed before anything is
//! published here; the broadcast channel is a delivery accelerant, never the
//! source of truth. Publishing never blocks on slow subscribers: each
//! receiver has a bounded buffer and sheds its oldest unread pushes when it
//! falls behind, which is harmless because a reconnecting client re-reads
//! the snapshot.

pub mod stream;

use tokio::sync::broadcast;

use crate::models::Notification;

pub use stream::{ReconnectBackoff, StreamClientState, StreamMessage};

/// Event fanned out to live admin streams.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Notification(Notification),
    UnreadCount(i64),
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<StreamEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Deliver to every currently-registered subscriber. A send with no
    /// subscribers is not an error; the record already exists in the store.
    pub fn publish(&self, event: StreamEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::trace!(error = %err, "no live stream subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_notification(title: &str) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind: "ORDER_STATUS_CHANGED".into(),
            title: title.into(),
            message: "order TY-000001 moved".into(),
            order_id: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn every_connected_subscriber_sees_a_publish() {
        let notifier = Notifier::new(8);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.publish(StreamEvent::Notification(sample_notification("hello")));

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                StreamEvent::Notification(n) => assert_eq!(n.title, "hello"),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_publishes() {
        let notifier = Notifier::new(8);
        notifier.publish(StreamEvent::Notification(sample_notification("early")));

        let mut late = notifier.subscribe();
        notifier.publish(StreamEvent::UnreadCount(3));

        match late.recv().await.unwrap() {
            StreamEvent::UnreadCount(3) => {}
            other => panic!("late subscriber should only see the later event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_subscriber_sheds_oldest_events() {
        let notifier = Notifier::new(2);
        let mut slow = notifier.subscribe();

        for i in 0..5 {
            notifier.publish(StreamEvent::UnreadCount(i));
        }

        // The first receive reports the lag; the buffer kept the newest two.
        match slow.recv().await {
            Err(broadcast::error::RecvError::Lagged(missed)) => assert_eq!(missed, 3),
            other => panic!("expected lag, got {other:?}"),
        }
        match slow.recv().await.unwrap() {
            StreamEvent::UnreadCount(3) => {}
            other => panic!("expected the surviving oldest event, got {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let notifier = Notifier::new(2);
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.publish(StreamEvent::UnreadCount(1));
    }
}

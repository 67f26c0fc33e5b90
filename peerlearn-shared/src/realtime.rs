/// In-process realtime fan-out
///
/// Every event is sent once on a single `tokio::sync::broadcast` channel and
/// carries the ID of the user it is meant for. Each subscriber filters the
/// channel down to its own user. A subscriber that falls more than
/// [`DEFAULT_CAPACITY`] events behind skips what it missed and carries on;
/// clients reconcile by re-fetching lists.
///
/// # Example
///
/// ```
/// use futures::StreamExt;
/// use peerlearn_shared::realtime::{RealtimeHub, RealtimePayload};
/// use uuid::Uuid;
///
/// # async fn example() {
/// let hub = RealtimeHub::new();
/// let user = Uuid::new_v4();
/// let mut stream = Box::pin(hub.stream_for(user));
///
/// hub.publish(user, RealtimePayload::UnreadCount { unread: 3 });
/// assert!(matches!(stream.next().await, Some(RealtimePayload::UnreadCount { unread: 3 })));
/// # }
/// ```

use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::chat::ChatMessage;
use crate::models::notification::Notification;

/// Buffered events per subscriber before it starts lagging
pub const DEFAULT_CAPACITY: usize = 1024;

/// Event body as delivered to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RealtimePayload {
    Notification(Notification),
    ChatMessage(ChatMessage),
    UnreadCount { unread: i64 },
}

impl RealtimePayload {
    /// SSE event name
    pub fn event_name(&self) -> &'static str {
        match self {
            RealtimePayload::Notification(_) => "notification",
            RealtimePayload::ChatMessage(_) => "chat_message",
            RealtimePayload::UnreadCount { .. } => "unread_count",
        }
    }
}

/// Event addressed to one user
#[derive(Debug, Clone)]
pub struct RealtimeEvent {
    pub recipient_id: Uuid,
    pub payload: RealtimePayload,
}

/// Cloneable handle to the broadcast channel
#[derive(Debug, Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event; returns how many subscribers saw it
    ///
    /// Having no subscribers is normal (nobody online) and not an error.
    pub fn publish(&self, recipient_id: Uuid, payload: RealtimePayload) -> usize {
        let kind = payload.event_name();
        match self.sender.send(RealtimeEvent {
            recipient_id,
            payload,
        }) {
            Ok(n) => {
                debug!(recipient = %recipient_id, kind, subscribers = n, "Published realtime event");
                n
            }
            Err(_) => 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream of `user_id`'s events, in publish order
    ///
    /// Ends when every hub handle is dropped.
    pub fn stream_for(&self, user_id: Uuid) -> impl Stream<Item = RealtimePayload> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(move |item| async move {
            match item {
                Ok(event) if event.recipient_id == user_id => Some(event.payload),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(user_id = %user_id, skipped, "Realtime subscriber lagged");
                    None
                }
            }
        })
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::time::Duration;

    async fn next<S>(stream: &mut Pin<Box<S>>) -> Option<RealtimePayload>
    where
        S: Stream<Item = RealtimePayload>,
    {
        tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("event within a second")
    }

    #[tokio::test]
    async fn test_events_are_filtered_by_recipient() {
        let hub = RealtimeHub::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut alice_events = Box::pin(hub.stream_for(alice));
        let mut bob_events = Box::pin(hub.stream_for(bob));

        hub.publish(bob, RealtimePayload::UnreadCount { unread: 1 });
        hub.publish(alice, RealtimePayload::UnreadCount { unread: 2 });

        assert!(matches!(
            next(&mut alice_events).await,
            Some(RealtimePayload::UnreadCount { unread: 2 })
        ));
        assert!(matches!(
            next(&mut bob_events).await,
            Some(RealtimePayload::UnreadCount { unread: 1 })
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = RealtimeHub::new();
        assert_eq!(hub.publish(Uuid::new_v4(), RealtimePayload::UnreadCount { unread: 0 }), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_ahead() {
        let hub = RealtimeHub::with_capacity(2);
        let user = Uuid::new_v4();
        let mut events = Box::pin(hub.stream_for(user));

        for unread in 0..5 {
            hub.publish(user, RealtimePayload::UnreadCount { unread });
        }

        // The two most recent events survive.
        assert!(matches!(
            next(&mut events).await,
            Some(RealtimePayload::UnreadCount { unread: 3 })
        ));
        assert!(matches!(
            next(&mut events).await,
            Some(RealtimePayload::UnreadCount { unread: 4 })
        ));
    }

    #[tokio::test]
    async fn test_stream_preserves_order() {
        let hub = RealtimeHub::new();
        let user = Uuid::new_v4();
        let mut stream = Box::pin(hub.stream_for(user));

        hub.publish(Uuid::new_v4(), RealtimePayload::UnreadCount { unread: 99 });
        hub.publish(user, RealtimePayload::UnreadCount { unread: 1 });
        hub.publish(user, RealtimePayload::UnreadCount { unread: 2 });

        let first = next(&mut stream).await;
        let second = next(&mut stream).await;
        assert!(matches!(first, Some(RealtimePayload::UnreadCount { unread: 1 })));
        assert!(matches!(second, Some(RealtimePayload::UnreadCount { unread: 2 })));
    }

    #[test]
    fn test_payload_serialization() {
        let json = serde_json::to_value(RealtimePayload::UnreadCount { unread: 4 }).unwrap();
        assert_eq!(json["type"], "unread_count");
        assert_eq!(json["data"]["unread"], 4);
    }
}

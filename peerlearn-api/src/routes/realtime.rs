/// Realtime event stream
///
/// `GET /v1/realtime/stream` opens a Server-Sent Events stream of the
/// caller's notifications, chat messages and unread-count updates, in
/// arrival order. Browsers cannot set headers on `EventSource`, so the token
/// may also be passed as `?access_token=`.
///
/// # SSE Event Format
///
/// ```text
/// event: notification
/// data: {"type":"notification","data":{...}}
/// ```
///
/// A client that falls behind the hub's buffer misses the skipped events;
/// the stream continues with the next one.

use crate::app::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::Stream;
use peerlearn_shared::{auth::middleware::AuthContext, realtime::RealtimePayload};
use std::{convert::Infallible, time::Duration};
use tokio_stream::StreamExt as _;
use tracing::{info, warn};

/// Keep-alive comment interval
const KEEP_ALIVE_SECS: u64 = 25;

/// Converts a payload into an SSE event named after its kind
fn to_event(payload: &RealtimePayload) -> Event {
    Event::default()
        .event(payload.event_name())
        .json_data(payload)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode realtime event");
            Event::default().comment("encode error")
        })
}

pub async fn stream(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(user_id = %auth.user_id, "Realtime stream opened");

    let events = state
        .hub
        .stream_for(auth.user_id)
        .map(|payload| Ok(to_event(&payload)));

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlearn_shared::realtime::RealtimeHub;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_hub_events_become_named_sse_events() {
        let hub = RealtimeHub::new();
        let user = Uuid::new_v4();
        let mut events = Box::pin(hub.stream_for(user).map(|p| p.event_name()));

        hub.publish(user, RealtimePayload::UnreadCount { unread: 3 });
        assert_eq!(events.next().await, Some("unread_count"));
    }
}

//! Wire envelope for the admin notification stream, plus the reconnect
//! policy consumed by stream clients.
//!
//! The envelope is transport-agnostic JSON; the SSE handler in
//! `routes::admin` is just one carrier for it.

use std::time::Duration;

use axum::response::sse::Event;
use serde::Serialize;

use crate::models::Notification;
use crate::notify::StreamEvent;

/// One message on the server-to-client stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum StreamMessage {
    #[serde(rename_all = "camelCase")]
    Init {
        notifications: Vec<Notification>,
        unread_count: i64,
    },
    Notification(Notification),
    UnreadCount(i64),
}

impl From<StreamEvent> for StreamMessage {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Notification(n) => StreamMessage::Notification(n),
            StreamEvent::UnreadCount(c) => StreamMessage::UnreadCount(c),
        }
    }
}

impl StreamMessage {
    pub fn to_sse_event(&self) -> Event {
        match serde_json::to_string(self) {
            Ok(json) => Event::default().data(json),
            Err(err) => {
                tracing::error!(error = %err, "failed to encode stream message");
                Event::default().comment("encode-error")
            }
        }
    }
}

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Exponential reconnect backoff: starts at the initial delay, doubles per
/// attempt, caps at the maximum, and resets on a successful connect.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
    }
}

/// Connection lifecycle of a stream client. Reconnecting re-triggers the
/// snapshot, so nothing published during a disconnect window is permanently
/// lost; only the live-push ordering across the gap is unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamClientState {
    Disconnected,
    Backoff(Duration),
    Connecting,
    Connected,
}

#[derive(Debug)]
pub struct StreamClient {
    state: StreamClientState,
    backoff: ReconnectBackoff,
}

impl StreamClient {
    pub fn new(backoff: ReconnectBackoff) -> Self {
        Self {
            state: StreamClientState::Disconnected,
            backoff,
        }
    }

    pub fn state(&self) -> StreamClientState {
        self.state
    }

    /// A connect attempt begins (either the first one, or after a backoff
    /// delay has elapsed).
    pub fn on_connect_started(&mut self) {
        self.state = StreamClientState::Connecting;
    }

    pub fn on_connected(&mut self) {
        self.backoff.reset();
        self.state = StreamClientState::Connected;
    }

    /// Connection lost or attempt failed; returns the delay to wait before
    /// the next attempt.
    pub fn on_disconnected(&mut self) -> Duration {
        let delay = self.backoff.next_delay();
        self.state = StreamClientState::Backoff(delay);
        delay
    }
}

impl Default for StreamClient {
    fn default() -> Self {
        Self::new(ReconnectBackoff::default())
    }
}

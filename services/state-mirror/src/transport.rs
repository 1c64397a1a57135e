//! Websocket transport
//!
//! `WsConnect` owns one websocket connection to the venue. It is pull-based:
//! the consumer awaits `next_event()` and hands each decoded frame to the
//! dispatcher on the same task.
//!
//! The connection remembers `subscribed` events so a later unsubscribe can
//! be addressed by channel name or by channel id. Unsubscribing from an
//! untracked target fails with `SubscriptionNotFound` and sends nothing.

use std::fmt;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use types::errors::MirrorError;
use types::frame::{chan_id_of, decode_frame, ChannelId};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A decoded inbound frame
    Message(Value),
    /// An undecodable frame or a socket failure
    Error(MirrorError),
    /// The connection is closed; further calls keep returning `Closed`
    Closed,
}

/// A channel the venue confirmed with a `subscribed` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedChannel {
    pub channel: String,
    pub chan_id: ChannelId,
}

/// How an unsubscribe names its subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeTarget {
    /// Channel name, e.g. `book`
    Channel(String),
    ChanId(ChannelId),
}

impl UnsubscribeTarget {
    fn matches(&self, tracked: &TrackedChannel) -> bool {
        match self {
            UnsubscribeTarget::Channel(name) => tracked.channel == *name,
            UnsubscribeTarget::ChanId(id) => tracked.chan_id == *id,
        }
    }
}

impl From<&str> for UnsubscribeTarget {
    fn from(name: &str) -> Self {
        UnsubscribeTarget::Channel(name.to_string())
    }
}

impl From<String> for UnsubscribeTarget {
    fn from(name: String) -> Self {
        UnsubscribeTarget::Channel(name)
    }
}

impl From<ChannelId> for UnsubscribeTarget {
    fn from(chan_id: ChannelId) -> Self {
        UnsubscribeTarget::ChanId(chan_id)
    }
}

impl fmt::Display for UnsubscribeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsubscribeTarget::Channel(name) => f.write_str(name),
            UnsubscribeTarget::ChanId(id) => write!(f, "{}", id),
        }
    }
}

/// Subscriptions confirmed on one connection, in confirmation order.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionTracker {
    tracked: Vec<TrackedChannel>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a `subscribed` event. Returns whether the frame was one.
    pub fn observe(&mut self, frame: &Value) -> bool {
        if frame.get("event").and_then(Value::as_str) != Some("subscribed") {
            return false;
        }

        let channel = frame.get("channel").and_then(Value::as_str);
        let chan_id = frame.get("chanId").and_then(chan_id_of);

        match (channel, chan_id) {
            (Some(channel), Some(chan_id)) if !channel.is_empty() && chan_id != 0 => {
                self.tracked.push(TrackedChannel {
                    channel: channel.to_string(),
                    chan_id,
                });
                true
            }
            _ => false,
        }
    }

    /// Remove and return the first subscription matching `target`.
    pub fn take(&mut self, target: &UnsubscribeTarget) -> Result<TrackedChannel, MirrorError> {
        let index = self
            .tracked
            .iter()
            .position(|tracked| target.matches(tracked))
            .ok_or_else(|| MirrorError::SubscriptionNotFound {
                target: target.to_string(),
            })?;

        Ok(self.tracked.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedChannel> {
        self.tracked.iter()
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}

/// `{event: "subscribe", channel, ...options}`. Options win on key clashes.
pub fn subscribe_request(channel: &str, options: &Map<String, Value>) -> Value {
    let mut request = json!({ "event": "subscribe", "channel": channel });
    merge(&mut request, options);
    request
}

/// `{event: "unsubscribe", chanId, ...options}`
pub fn unsubscribe_request(chan_id: ChannelId, options: &Map<String, Value>) -> Value {
    let mut request = json!({ "event": "unsubscribe", "chanId": chan_id });
    merge(&mut request, options);
    request
}

fn merge(request: &mut Value, options: &Map<String, Value>) {
    if let Value::Object(map) = request {
        for (key, value) in options {
            map.insert(key.clone(), value.clone());
        }
    }
}

/// One websocket connection to the venue.
pub struct WsConnect {
    id: Uuid,
    url: String,
    stream: Option<WsStream>,
    subscriptions: SubscriptionTracker,
}

impl WsConnect {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            url: url.into(),
            stream: None,
            subscriptions: SubscriptionTracker::new(),
        }
    }

    /// Connection id for log correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn subscriptions(&self) -> &SubscriptionTracker {
        &self.subscriptions
    }

    pub async fn open(&mut self) -> Result<(), MirrorError> {
        let (stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| MirrorError::Transport(e.to_string()))?;

        self.stream = Some(stream);
        info!(conn_id = %self.id, url = %self.url, "Transport open");
        Ok(())
    }

    /// Close the connection. No-op when not connected.
    pub async fn close(&mut self) -> Result<(), MirrorError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .close(None)
                .await
                .map_err(|e| MirrorError::Transport(e.to_string()))?;
            info!(conn_id = %self.id, "Transport closed");
        }
        Ok(())
    }

    /// Send one JSON message as a text frame.
    pub async fn send(&mut self, message: &Value) -> Result<(), MirrorError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| MirrorError::Transport("not connected".to_string()))?;

        stream
            .send(Message::Text(message.to_string()))
            .await
            .map_err(|e| MirrorError::Transport(e.to_string()))
    }

    pub async fn subscribe(
        &mut self,
        channel: &str,
        options: &Map<String, Value>,
    ) -> Result<(), MirrorError> {
        debug!(conn_id = %self.id, channel, "Subscribing");
        self.send(&subscribe_request(channel, options)).await
    }

    /// Unsubscribe by channel name or channel id. Only subscriptions the
    /// venue confirmed on this connection can be addressed.
    pub async fn unsubscribe(
        &mut self,
        target: impl Into<UnsubscribeTarget>,
        options: &Map<String, Value>,
    ) -> Result<(), MirrorError> {
        let target = target.into();
        let tracked = self.subscriptions.take(&target).map_err(|e| {
            warn!(conn_id = %self.id, target = %target, "Unsubscribe target not found");
            e
        })?;

        debug!(conn_id = %self.id, channel = %tracked.channel, chan_id = tracked.chan_id, "Unsubscribing");
        self.send(&unsubscribe_request(tracked.chan_id, options)).await
    }

    /// Wait for the next inbound frame, error or close.
    pub async fn next_event(&mut self) -> TransportEvent {
        loop {
            let Some(stream) = self.stream.as_mut() else {
                return TransportEvent::Closed;
            };

            let text = match stream.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        return TransportEvent::Error(MirrorError::Decode {
                            raw: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                            detail: e.utf8_error().to_string(),
                        })
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    info!(conn_id = %self.id, frame = ?frame, "Transport closed by peer");
                    self.stream = None;
                    return TransportEvent::Closed;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(conn_id = %self.id, error = %e, "Transport error");
                    self.stream = None;
                    return TransportEvent::Error(MirrorError::Transport(e.to_string()));
                }
                None => {
                    info!(conn_id = %self.id, "Transport stream ended");
                    self.stream = None;
                    return TransportEvent::Closed;
                }
            };

            return match decode_frame(&text) {
                Ok(frame) => {
                    self.subscriptions.observe(&frame);
                    TransportEvent::Message(frame)
                }
                Err(e) => TransportEvent::Error(e),
            };
        }
    }
}

impl fmt::Debug for WsConnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsConnect")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("connected", &self.is_connected())
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

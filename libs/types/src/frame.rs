//! Inbound protocol frames
//!
//! The feed emits three frame shapes:
//! - Event frames: `{"event": ..., "channel": ..., "chanId": ..., ...}`
//! - Data frames: `[chanId, payload]` or `[chanId, tag, payload]`
//! - Info frames on the account channel: `[0, typeTag, payload]`
//!
//! Heartbeats (`[chanId, "hb"]`) carry no data. `Frame::classify` borrows
//! the decoded JSON and never copies payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::MirrorError;

/// Channel id assigned by the venue on subscribe
pub type ChannelId = u64;

/// Heartbeat marker in the tag position
pub const HEARTBEAT: &str = "hb";

/// Channel id of the account info channel
pub const INFO_CHANNEL: ChannelId = 0;

static NULL_VALUE: Value = Value::Null;

/// Decode one text frame. Failures carry the raw text.
pub fn decode_frame(raw: &str) -> Result<Value, MirrorError> {
    serde_json::from_str(raw).map_err(|e| MirrorError::Decode {
        raw: raw.to_string(),
        detail: e.to_string(),
    })
}

/// Event frame (`subscribed`, `unsubscribed`, `error`, `info`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(
        rename = "chanId",
        default,
        deserialize_with = "de_chan_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub chan_id: Option<ChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Remaining metadata (`pair`, `prec`, `len`, `code`, `msg`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventFrame {
    /// Symbol of the subscription, falling back to `pair`.
    pub fn symbol_or_pair(&self) -> Option<&str> {
        self.symbol
            .as_deref()
            .or_else(|| self.extra.get("pair").and_then(Value::as_str))
    }

    /// Metadata field as text.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

fn de_chan_id<'de, D>(deserializer: D) -> Result<Option<ChannelId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(chan_id_of))
}

/// Channel id from a number or a numeric string (`0` and `"0"` both occur).
pub fn chan_id_of(value: &Value) -> Option<ChannelId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Tag and payload of a data or info frame, as handed to models
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBody<'a> {
    pub tag: Option<&'a str>,
    pub payload: &'a Value,
}

impl<'a> FrameBody<'a> {
    pub fn untagged(payload: &'a Value) -> Self {
        Self { tag: None, payload }
    }

    pub fn tagged(tag: &'a str, payload: &'a Value) -> Self {
        Self {
            tag: Some(tag),
            payload,
        }
    }

    /// Payload elements, or an empty slice for non-array payloads.
    pub fn items(&self) -> &'a [Value] {
        self.payload.as_array().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A classified inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<'a> {
    Event(EventFrame),
    Heartbeat {
        chan_id: ChannelId,
    },
    /// `[0, tag, payload]` on the account channel
    Info {
        tag: &'a str,
        payload: &'a Value,
    },
    Data {
        chan_id: ChannelId,
        tag: Option<&'a str>,
        payload: &'a Value,
    },
    /// Valid JSON that is none of the above
    Unrecognized,
}

impl<'a> Frame<'a> {
    pub fn classify(value: &'a Value) -> Result<Self, MirrorError> {
        match value {
            Value::Object(map) if map.contains_key("event") => {
                let event = EventFrame::deserialize(value)
                    .map_err(|e| MirrorError::malformed("event frame", e.to_string()))?;
                Ok(Frame::Event(event))
            }
            Value::Array(items) => Self::classify_array(items),
            _ => Ok(Frame::Unrecognized),
        }
    }

    fn classify_array(items: &'a [Value]) -> Result<Self, MirrorError> {
        let first = items
            .first()
            .ok_or_else(|| MirrorError::malformed("data frame", "empty frame"))?;
        let chan_id = chan_id_of(first).ok_or_else(|| {
            MirrorError::malformed("data frame", format!("invalid channel id {}", first))
        })?;

        let second = items.get(1).unwrap_or(&NULL_VALUE);

        if second.as_str() == Some(HEARTBEAT) {
            return Ok(Frame::Heartbeat { chan_id });
        }

        let payload = items.get(2).unwrap_or(&NULL_VALUE);

        if chan_id == INFO_CHANNEL {
            let tag = second.as_str().ok_or_else(|| {
                MirrorError::malformed("info frame", format!("invalid type tag {}", second))
            })?;
            return Ok(Frame::Info { tag, payload });
        }

        match second.as_str() {
            Some(tag) => Ok(Frame::Data {
                chan_id,
                tag: Some(tag),
                payload,
            }),
            None => Ok(Frame::Data {
                chan_id,
                tag: None,
                payload: second,
            }),
        }
    }
}

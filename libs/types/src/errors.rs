//! Error types for the state mirror
//!
//! Error taxonomy using thiserror. Every failure surfaced by decoding,
//! reconciliation, the component registry or the transport is a
//! `MirrorError`.

use thiserror::Error;

/// Top-level mirror error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MirrorError {
    /// Inbound text was not valid JSON. Carries the raw text.
    #[error("Failed to decode frame: {detail} (raw: {raw})")]
    Decode { raw: String, detail: String },

    /// Valid JSON that does not have the shape the model expects.
    #[error("Malformed {what}: {reason}")]
    MalformedFrame { what: &'static str, reason: String },

    #[error("Subscription not found: {target}")]
    SubscriptionNotFound { target: String },

    /// The model does not support this operation.
    #[error("{model}: {operation} is not implemented")]
    NotImplemented {
        model: &'static str,
        operation: &'static str,
    },

    #[error("No model registered for {kind}")]
    UnknownComponent { kind: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl MirrorError {
    /// Shorthand for a `MalformedFrame` error.
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        MirrorError::MalformedFrame {
            what,
            reason: reason.into(),
        }
    }
}

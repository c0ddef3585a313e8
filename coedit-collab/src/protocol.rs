//! Wire protocol for editor synchronization.
//!
//! Two layers:
//!
//! - [`MessagePayload`] — the closed tagged union of everything a
//!   participant can say: a caret move, a selection change, or a versioned
//!   content edit. Serialized by a [`crate::codec::PayloadCodec`].
//! - [`Envelope`] — the transport-level wrapper around the encoded payload
//!   bytes. `sender_id` is `None` while an envelope is still local; the
//!   transport stamps it on delivery, and an inbound envelope without one
//!   is malformed and dropped.
//!
//! Every `CodeEdit` carries the document version it produced, which is the
//! only ordering mechanism in the protocol: receivers reject anything not
//! strictly newer than their own document instead of relying on transport
//! ordering.

use serde::{Deserialize, Serialize};

use coedit_core::{Position, TextChange};

/// Everything a remote participant can tell us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessagePayload {
    /// The sender's caret moved.
    CursorPosition { position: Position },
    /// The sender's selection changed. `start <= end` after normalization.
    CursorSelection { start: Position, end: Position },
    /// The sender edited the document, producing `version`.
    CodeEdit { version: u64, changes: Vec<TextChange> },
}

/// Transport-level wrapper around one encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Originating participant. `None` ⇒ locally originated, not yet
    /// stamped by the transport.
    pub sender_id: Option<String>,
    /// Codec-encoded [`MessagePayload`] bytes.
    pub payload: Vec<u8>,
    /// Unix milliseconds at send time.
    pub timestamp: Option<u64>,
}

impl Envelope {
    /// Wrap locally-produced payload bytes, stamped with the current time
    /// but no sender (the transport owns sender identity).
    pub fn local(payload: Vec<u8>) -> Self {
        Self { sender_id: None, payload, timestamp: Some(unix_millis()) }
    }

    /// Serialize for a byte-oriented transport.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| ProtocolError::EncodeFailed(e.to_string()))
    }

    /// Deserialize from a byte-oriented transport.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (envelope, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| ProtocolError::DecodeFailed(e.to_string()))?;
        Ok(envelope)
    }
}

/// Wall-clock milliseconds since the unix epoch.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Protocol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    EncodeFailed(String),
    DecodeFailed(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EncodeFailed(e) => write!(f, "encode failed: {e}"),
            Self::DecodeFailed(e) => write!(f, "decode failed: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

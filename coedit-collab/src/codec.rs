//! Pluggable payload codecs.
//!
//! The controller treats encode/decode as an opaque step that round-trips
//! losslessly; everything else about the byte shape is the codec's
//! business. [`Lz4Codec`] is the default: bincode-serialize, then LZ4
//! block compression with a length prefix. [`PlainCodec`] skips the
//! compression step for debugging and tests.

use bincode::config;
use serde::{Deserialize, Serialize};

use crate::protocol::MessagePayload;

/// Encode/decode step between [`MessagePayload`] and wire bytes.
pub trait PayloadCodec {
    fn encode(&self, payload: &MessagePayload) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<MessagePayload, CodecError>;
}

/// Compress-then-serialize codec: bincode → LZ4 (size-prepended block).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl PayloadCodec for Lz4Codec {
    fn encode(&self, payload: &MessagePayload) -> Result<Vec<u8>, CodecError> {
        let serialized = serialize(payload)?;
        Ok(lz4_flex::compress_prepend_size(&serialized))
    }

    fn decode(&self, bytes: &[u8]) -> Result<MessagePayload, CodecError> {
        let decompressed = lz4_flex::decompress_size_prepended(bytes)
            .map_err(|e| CodecError::Decompress(e.to_string()))?;
        deserialize(&decompressed)
    }
}

/// Bincode-only codec, no compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl PayloadCodec for PlainCodec {
    fn encode(&self, payload: &MessagePayload) -> Result<Vec<u8>, CodecError> {
        serialize(payload)
    }

    fn decode(&self, bytes: &[u8]) -> Result<MessagePayload, CodecError> {
        deserialize(bytes)
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serde::encode_to_vec(value, config::standard())
        .map_err(|e| CodecError::Encode(e.to_string()))
}

fn deserialize<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, CodecError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, config::standard())
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(value)
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Encode(String),
    Decode(String),
    Decompress(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "payload encode failed: {e}"),
            Self::Decode(e) => write!(f, "payload decode failed: {e}"),
            Self::Decompress(e) => write!(f, "payload decompression failed: {e}"),
        }
    }
}

impl std::error::Error for CodecError {}

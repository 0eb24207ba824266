//! Dual-format value serialization
//!
//! Every encoded payload starts with a one-byte format marker chosen at
//! encode time, so decode is a direct dispatch on the marker rather than a
//! try-one-format-then-fall-back dance.
//!
//! # Example
//!
//! ```
//! use stratacache::codec::{decode, encode, CacheValue};
//!
//! let value = CacheValue::Structured(serde_json::json!({"price": 1_500_000}));
//! let raw = encode(&value).unwrap();
//! assert_eq!(decode(&raw).unwrap(), value);
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{Error, Result};

// =============================================================================
// Value Format
// =============================================================================

/// Encoding strategy, written as the first byte of every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueFormat {
    /// Plain maps/sequences/primitives, stored as JSON bytes
    Structured,
    /// Caller-provided binary payload, stored verbatim
    Opaque,
}

impl ValueFormat {
    /// Marker byte written at encode time.
    pub fn marker(self) -> u8 {
        match self {
            ValueFormat::Structured => 0x01,
            ValueFormat::Opaque => 0x02,
        }
    }

    /// Dispatch on a marker byte.
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            0x01 => Some(ValueFormat::Structured),
            0x02 => Some(ValueFormat::Opaque),
            _ => None,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            ValueFormat::Structured => "structured",
            ValueFormat::Opaque => "opaque",
        }
    }
}

impl std::fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Cache Value
// =============================================================================

/// A value the cache can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// JSON-representable data: portable and human-inspectable
    Structured(serde_json::Value),
    /// Binary data the structured form cannot express
    Opaque(Bytes),
}

impl CacheValue {
    /// Build a structured value from anything serializable.
    ///
    /// Values JSON cannot represent (e.g. maps with non-string keys) fail
    /// here with an explicit encode error rather than being truncated.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(CacheValue::Structured)
            .map_err(Error::Encode)
    }

    /// Build an opaque binary value.
    pub fn opaque(data: impl Into<Bytes>) -> Self {
        CacheValue::Opaque(data.into())
    }

    /// Which encoding strategy this value uses.
    pub fn format(&self) -> ValueFormat {
        match self {
            CacheValue::Structured(_) => ValueFormat::Structured,
            CacheValue::Opaque(_) => ValueFormat::Opaque,
        }
    }

    /// Structured payload, if this is a structured value.
    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            CacheValue::Structured(v) => Some(v),
            CacheValue::Opaque(_) => None,
        }
    }

    /// Opaque payload, if this is an opaque value.
    pub fn as_opaque(&self) -> Option<&Bytes> {
        match self {
            CacheValue::Opaque(b) => Some(b),
            CacheValue::Structured(_) => None,
        }
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        CacheValue::Structured(value)
    }
}

impl From<Bytes> for CacheValue {
    fn from(data: Bytes) -> Self {
        CacheValue::Opaque(data)
    }
}

// =============================================================================
// Encode / Decode
// =============================================================================

/// Encode a value into tagged backend-storable bytes.
pub fn encode(value: &CacheValue) -> Result<Bytes> {
    match value {
        CacheValue::Structured(json) => {
            let payload = serde_json::to_vec(json).map_err(Error::Encode)?;
            let mut buf = BytesMut::with_capacity(1 + payload.len());
            buf.put_u8(ValueFormat::Structured.marker());
            buf.put_slice(&payload);
            Ok(buf.freeze())
        }
        CacheValue::Opaque(data) => {
            let mut buf = BytesMut::with_capacity(1 + data.len());
            buf.put_u8(ValueFormat::Opaque.marker());
            buf.put_slice(data);
            Ok(buf.freeze())
        }
    }
}

/// Decode tagged bytes back into a value.
///
/// Dispatches directly on the marker byte; empty input, an unknown marker,
/// or a corrupt structured payload are decode failures, which the engine
/// treats as a per-tier miss.
pub fn decode(raw: &[u8]) -> Result<CacheValue> {
    let (&marker, payload) = raw.split_first().ok_or_else(|| Error::Decode {
        reason: "empty payload".to_string(),
    })?;

    match ValueFormat::from_marker(marker) {
        Some(ValueFormat::Structured) => serde_json::from_slice(payload)
            .map(CacheValue::Structured)
            .map_err(|e| Error::Decode {
                reason: format!("corrupt structured payload: {}", e),
            }),
        Some(ValueFormat::Opaque) => Ok(CacheValue::Opaque(Bytes::copy_from_slice(payload))),
        None => Err(Error::Decode {
            reason: format!("unknown format marker: {:#04x}", marker),
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================

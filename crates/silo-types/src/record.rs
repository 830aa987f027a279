//! The persisted record and its index projection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::value::ValueKind;

/// Encoding bit recorded when a payload passed through the binary encoder.
pub const ENC_BINARY: u8 = 1;
/// Encoding bit recorded when a payload was obfuscated with a secret.
pub const ENC_ENCRYPTED: u8 = 2;

/// The unit persisted for one key: metadata plus the transformed payload.
///
/// A record is written as a pretty-printed JSON object and is exactly
/// reconstructible from that form. `value` holds the payload after all
/// encoding transforms; `encoding` records which transforms were applied
/// (`ENC_BINARY`, `ENC_ENCRYPTED`, or both). When both bits are set the
/// binary encoding was applied first, so decoding inverts the obfuscation
/// before the base decoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    /// Creation or last-rewrite time (UTC).
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Payload size after transforms: bytes for text, element count for
    /// structured values.
    pub size: u64,
    /// Absolute unix expiry in seconds; 0 means the record never expires.
    #[serde(default, skip_serializing_if = "is_default")]
    pub expiry: u64,
    #[serde(default, skip_serializing_if = "is_default")]
    pub encoding: u8,
    /// Caller-supplied metadata merged in at `set` time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Json>,
    #[serde(default)]
    pub value: Json,
}

fn is_default<T: Default + PartialEq>(v: &T) -> bool {
    *v == T::default()
}

impl Record {
    /// Create a record stamped with the current time and no payload.
    pub fn new(key: impl Into<String>, kind: ValueKind, size: u64) -> Self {
        Self {
            key: key.into(),
            timestamp: Utc::now(),
            kind,
            size,
            expiry: 0,
            encoding: 0,
            extra: BTreeMap::new(),
            value: Json::Null,
        }
    }

    /// `true` once the expiry deadline has passed. Records with expiry 0
    /// never expire.
    pub fn is_expired(&self, now_unix: u64) -> bool {
        self.expiry != 0 && now_unix >= self.expiry
    }

    /// `true` when the record carries a payload. A record that parsed but
    /// has a null payload is treated as damaged by the engine.
    pub fn has_payload(&self) -> bool {
        !self.value.is_null()
    }

    /// Refresh the timestamp. Every wholesale rewrite goes through this.
    pub fn touch(&mut self) {
        self.timestamp = Utc::now();
    }

    /// Serialize to the on-disk JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Parse the on-disk JSON form.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Project this record into its index entry at the given shard path.
    pub fn index_entry(&self, path: impl Into<String>) -> IndexEntry {
        IndexEntry {
            key: self.key.clone(),
            path: path.into(),
            timestamp: self.timestamp,
            expiry: self.expiry,
            kind: self.kind,
            size: self.size,
            encoding: self.encoding,
        }
    }
}

/// Per-key summary kept in the database index file: everything a listing
/// needs without reading the record itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub key: String,
    /// Record location relative to the database directory, extension
    /// stripped (`"ab/cdef..."`).
    pub path: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub expiry: u64,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    pub size: u64,
    #[serde(default)]
    pub encoding: u8,
}

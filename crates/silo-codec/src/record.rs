//! Value classification and the record transform pipeline.
//!
//! On the way in, [`encode`] turns a [`Value`] into the payload persisted
//! inside a record: raw bytes pass through the binary encoder, and an
//! optional secret obfuscates the (possibly already encoded) textual form.
//! The record's encoding bits track which transforms were applied, so
//! [`decode`] can invert them in the right order on the way out.

use serde_json::Value as Json;

use silo_types::{Record, Value, ValueKind, ENC_BINARY, ENC_ENCRYPTED};

use crate::base;
use crate::error::{CodecError, CodecResult};
use crate::obfuscate;

/// Flags governing how a stored payload is unwound on read.
///
/// Each flag acts only when the record's corresponding encoding bit is set;
/// a blob request on a plain-text record is a no-op, and a decrypt secret
/// that fails to produce text leaves the payload untouched.
#[derive(Clone, Debug, Default)]
pub struct ReadFlags {
    /// Decode a binary payload back into raw bytes.
    pub blob: bool,
    /// Secret for deobfuscating an encrypted payload.
    pub decrypt: Option<String>,
}

/// Outcome of pushing a value through the write-side transforms.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    /// The payload as persisted in the record.
    pub payload: Json,
    pub kind: ValueKind,
    /// Payload size after all transforms.
    pub size: u64,
    /// Applied transform bits (`ENC_BINARY`, `ENC_ENCRYPTED`).
    pub encoding: u8,
}

/// `true` when `text` carries no control bytes other than tab, newline, and
/// carriage return. Multi-byte UTF-8 counts as printable.
pub fn is_printable_text(text: &str) -> bool {
    !text
        .bytes()
        .any(|b| (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r') || b == 0x7f)
}

/// Derive the persisted type tag for a value.
///
/// Strings are refined further: a string parsing fully as a JSON array or
/// object is tagged `json`, and one carrying control bytes is reclassified
/// as `binary`.
pub fn classify(value: &Value) -> ValueKind {
    match value {
        Value::Rejected => ValueKind::Rejected,
        Value::Bytes(_) => ValueKind::Binary,
        Value::Int(_) => ValueKind::Int,
        Value::Structured(_) => ValueKind::Structured,
        Value::Str(s) | Value::Json(s) => {
            if is_json_container(s) {
                ValueKind::Json
            } else if !is_printable_text(s) {
                ValueKind::Binary
            } else {
                ValueKind::String
            }
        }
    }
}

fn is_json_container(text: &str) -> bool {
    serde_json::from_str::<Json>(text)
        .map(|parsed| parsed.is_array() || parsed.is_object())
        .unwrap_or(false)
}

fn binary_payload(bytes: &[u8]) -> (Json, u64, u8) {
    let text = base::encode_binary(bytes);
    let size = text.len() as u64;
    (Json::String(text), size, ENC_BINARY)
}

fn container_len(tree: &Json) -> usize {
    match tree {
        Json::Array(items) => items.len(),
        Json::Object(map) => map.len(),
        _ => 0,
    }
}

/// Encode a value into its persisted payload, applying the binary transform
/// and, when a secret is given, obfuscation on top of it.
///
/// The returned size reflects the payload after all transforms. `Rejected`
/// values are refused.
pub fn encode(value: &Value, encrypt_secret: Option<&str>) -> CodecResult<Encoded> {
    let kind = classify(value);
    let (payload, size, encoding) = match value {
        Value::Rejected => return Err(CodecError::Unsupported),
        Value::Bytes(bytes) => binary_payload(bytes),
        Value::Int(n) => (Json::from(*n), n.to_string().len() as u64, 0),
        Value::Structured(tree) => (tree.clone(), container_len(tree) as u64, 0),
        Value::Str(s) | Value::Json(s) => {
            if kind == ValueKind::Binary {
                binary_payload(s.as_bytes())
            } else {
                (Json::String(s.clone()), s.len() as u64, 0)
            }
        }
    };

    let (payload, size, encoding) = match encrypt_secret {
        Some(secret) => {
            let text = match &payload {
                Json::String(s) => s.clone(),
                other => serde_json::to_string(other)
                    .map_err(|err| CodecError::Serialization(err.to_string()))?,
            };
            let sealed = obfuscate::obfuscate(&text, secret);
            let size = sealed.len() as u64;
            (Json::String(sealed), size, encoding | ENC_ENCRYPTED)
        }
        None => (payload, size, encoding),
    };

    Ok(Encoded {
        payload,
        kind,
        size,
        encoding,
    })
}

/// Unwind a record's payload according to the caller's flags.
///
/// Obfuscation is removed first (it was applied last), then the binary
/// encoding. Each inversion runs only when its flag is supplied AND the
/// matching encoding bit is set; anything else leaves the payload as
/// stored. Returns the reconstructed value and the encoding bits still in
/// effect after the transforms that ran.
pub fn decode(record: &Record, flags: &ReadFlags) -> (Value, u8) {
    let mut encoding = record.encoding;
    let mut payload = record.value.clone();

    if encoding & ENC_ENCRYPTED != 0 {
        if let (Some(secret), Some(text)) = (flags.decrypt.as_deref(), payload.as_str()) {
            // A wrong secret produces garbage; only printable text is
            // accepted, otherwise the ciphertext stays in place.
            match obfuscate::deobfuscate(text, secret) {
                Ok(plain) if is_printable_text(&plain) => {
                    payload = Json::String(plain);
                    encoding &= !ENC_ENCRYPTED;
                }
                _ => {}
            }
        }
    }

    if flags.blob
        && record.kind == ValueKind::Binary
        && encoding & ENC_BINARY != 0
        && encoding & ENC_ENCRYPTED == 0
    {
        if let Some(text) = payload.as_str() {
            if let Ok(bytes) = base::decode_binary(text) {
                return (Value::Bytes(bytes), 0);
            }
        }
    }

    (reconstruct(record.kind, payload, encoding), encoding)
}

fn reconstruct(kind: ValueKind, payload: Json, encoding: u8) -> Value {
    if encoding != 0 {
        // Transforms still applied: surface the stored text as-is.
        return match payload {
            Json::String(s) => Value::Str(s),
            other => Value::from(other),
        };
    }
    match kind {
        ValueKind::Int => match &payload {
            Json::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .unwrap_or_else(|| Value::Str(n.to_string())),
            Json::String(s) => s.parse().map(Value::Int).unwrap_or_else(|_| Value::Str(s.clone())),
            _ => Value::from(payload),
        },
        ValueKind::Json => match payload {
            Json::String(s) => Value::Json(s),
            other => Value::Json(other.to_string()),
        },
        ValueKind::Structured => match payload {
            Json::Array(_) | Json::Object(_) => Value::Structured(payload),
            Json::String(s) => serde_json::from_str(&s)
                .map(Value::Structured)
                .unwrap_or(Value::Str(s)),
            other => Value::from(other),
        },
        ValueKind::String | ValueKind::Binary | ValueKind::Rejected => match payload {
            Json::String(s) => Value::Str(s),
            other => Value::from(other),
        },
    }
}

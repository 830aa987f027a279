use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A value accepted by the store.
///
/// `Value` is a closed set of variants; there is no runtime reflection. The
/// persisted type tag ([`ValueKind`]) is derived from the variant, with
/// strings refined further by classification (JSON containers, binary text).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Plain text.
    Str(String),
    /// Signed 64-bit integer.
    Int(i64),
    /// Raw bytes; persisted through the binary encoder.
    Bytes(Vec<u8>),
    /// A string that parses fully as a JSON array or object.
    Json(String),
    /// A structured (array/object-like) value.
    Structured(Json),
    /// An input the store refuses to persist.
    Rejected,
}

impl Value {
    /// The integer this value looks like, if any.
    ///
    /// `Int` qualifies directly; a string qualifies when it is an optional
    /// leading `-` followed by nothing but ASCII digits. Everything else,
    /// including strings whose digits overflow `i64`, does not qualify.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) if is_integer_like(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Borrow the textual content, if this variant carries text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Json(s) => Some(s),
            _ => None,
        }
    }
}

/// `true` when `s` is an optional leading `-` followed by ASCII digits only.
pub fn is_integer_like(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Array(_) | Json::Object(_) => Self::Structured(json),
            Json::String(s) => Self::Str(s),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Str(n.to_string()),
            },
            Json::Bool(b) => Self::Str(b.to_string()),
            Json::Null => Self::Str(String::new()),
        }
    }
}

/// The persisted type tag of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Plain text.
    String,
    /// Integer.
    Int,
    /// A string holding a complete JSON document.
    Json,
    /// Array/object-like value stored as a JSON tree.
    Structured,
    /// Raw bytes, persisted in base-encoded form.
    Binary,
    /// Refused input; never persisted.
    Rejected,
}

impl ValueKind {
    /// Kinds that structural search can traverse or match against.
    pub fn is_searchable(&self) -> bool {
        !matches!(self, Self::Binary | Self::Rejected)
    }

    /// Kinds whose payload is a JSON container.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Json | Self::Structured)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Json => write!(f, "json"),
            Self::Structured => write!(f, "structured"),
            Self::Binary => write!(f, "binary"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

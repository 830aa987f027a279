//! Value classification and the encode/decode pipeline for Silo records.
//!
//! Three layers, from the bottom up:
//!
//! - [`base`] — custom base-alphabet conversion: binary payloads become text
//!   over an 89-symbol alphabet, digests become short fingerprints over a
//!   41-symbol alphabet.
//! - [`obfuscate`] — reversible XOR obfuscation keyed by a caller secret.
//!   NOT cryptography; it only keeps payloads from being casually readable.
//! - [`record`] — [`classify`](record::classify) a [`Value`], apply the
//!   binary/obfuscation transforms on the way in, and invert them on the way
//!   out according to the record's encoding bits and the caller's request.
//!
//! [`Value`]: silo_types::Value

pub mod base;
pub mod error;
pub mod obfuscate;
pub mod record;

pub use error::{CodecError, CodecResult};
pub use record::{classify, decode, encode, is_printable_text, Encoded, ReadFlags};

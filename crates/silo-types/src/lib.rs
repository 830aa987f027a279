//! Foundation types for Silo, the flat-file key/value store.
//!
//! This crate provides the data model shared by every other Silo crate.
//!
//! # Key Types
//!
//! - [`Value`] — Closed tagged variant for everything the store accepts
//! - [`ValueKind`] — The persisted type tag of a record
//! - [`Record`] — The self-describing unit persisted for one key
//! - [`IndexEntry`] — Per-key projection of [`Record`] kept in the index file

pub mod record;
pub mod value;

pub use record::{IndexEntry, Record, ENC_BINARY, ENC_ENCRYPTED};
pub use value::{Value, ValueKind};

//! Silo's storage engine: sharded flat-file records, a per-database index,
//! and the full public operation set.
//!
//! The [`Silo`] handle owns one logical database under one root directory.
//! Each key's value and metadata persist as a self-contained JSON record in
//! a two-level sharded directory tree; a single index file maps keys to
//! shard locations and summary metadata so existence checks and listings
//! never read the records themselves.
//!
//! ```no_run
//! use silo_store::{Options, Silo};
//!
//! # fn main() -> silo_store::StoreResult<()> {
//! let silo = Silo::new(Options::default())?;
//! silo.set("greeting", "hello world!")?;
//! assert!(silo.exists("greeting"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diag;
pub mod engine;
pub mod error;
pub mod fsutil;
pub mod index;
pub mod shard;

pub use config::{Options, CONFIG_ENV};
pub use diag::Diagnostic;
pub use engine::{ExpiryUpdate, Fetched, Found, Info, MatchSpec, Request, Silo};
pub use error::{StoreError, StoreResult};

//! Wildcard matching and recursive structural search.
//!
//! Two layers:
//!
//! - [`wildcard_match`] — glob-style matching with `*` (any run) and `?`
//!   (any one character), case-insensitive. Patterns without wildcard
//!   characters fall back to exact comparison.
//! - [`search_value`] / [`search_field`] — recursive traversal over a
//!   [`serde_json::Value`] tree, locating a matching scalar descendant or a
//!   field/value pair and returning the smallest enclosing sub-structure.

mod search;
mod wildcard;

pub use search::{search_field, search_value};
pub use wildcard::wildcard_match;

//! Recursive search over JSON trees.

use serde_json::{json, Value as Json};

use crate::wildcard::wildcard_match;

/// The scalar rendered for matching, if this node is a matchable scalar.
/// Null and containers are not matchable.
fn scalar_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Find the first scalar descendant whose rendered form matches `pattern`
/// and return the smallest enclosing sub-structure: the matched entry as a
/// single-field object, the bare element for array parents, or the scalar
/// itself when the tree is a scalar.
pub fn search_value(tree: &Json, pattern: &str) -> Option<Json> {
    match tree {
        Json::Object(map) => {
            for (key, child) in map {
                if let Some(text) = scalar_text(child) {
                    if wildcard_match(&text, pattern) {
                        return Some(json!({ key.clone(): child.clone() }));
                    }
                } else if let Some(found) = search_value(child, pattern) {
                    return Some(found);
                }
            }
            None
        }
        Json::Array(items) => {
            for child in items {
                if let Some(text) = scalar_text(child) {
                    if wildcard_match(&text, pattern) {
                        return Some(child.clone());
                    }
                } else if let Some(found) = search_value(child, pattern) {
                    return Some(found);
                }
            }
            None
        }
        scalar => scalar_text(scalar)
            .filter(|text| wildcard_match(text, pattern))
            .map(|_| scalar.clone()),
    }
}

/// Find a field whose name matches `field_pattern` and whose scalar value
/// matches `value_pattern`; return the smallest object containing that
/// field. Direct fields win over deeper matches.
pub fn search_field(tree: &Json, field_pattern: &str, value_pattern: &str) -> Option<Json> {
    match tree {
        Json::Object(map) => {
            for (key, child) in map {
                if wildcard_match(key, field_pattern) {
                    if let Some(text) = scalar_text(child) {
                        if wildcard_match(&text, value_pattern) {
                            return Some(tree.clone());
                        }
                    }
                }
            }
            map.values()
                .find_map(|child| search_field(child, field_pattern, value_pattern))
        }
        Json::Array(items) => items
            .iter()
            .find_map(|child| search_field(child, field_pattern, value_pattern)),
        _ => None,
    }
}

//! Upstream rewriting over an arbitrary routing document.
//!
//! A routing block is any JSON object with an `upstreams` array; each
//! entry names its target in a `dial` field (`"localhost:3402"`). Blocks
//! can appear at any depth, and the same backend is often declared by
//! several routes, so traversal is exhaustive.

use serde_json::Value;

/// Outcome of [`rewrite_upstream`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub document: Value,
    /// Number of upstream entries whose dial address was replaced.
    pub replaced: usize,
}

/// Replace every upstream `dial` equal to `old` with `new`.
///
/// Everything else in the document, including key order, is left as is.
/// Applying the same rewrite twice yields the same document as applying
/// it once.
pub fn rewrite_upstream(document: &Value, old: &str, new: &str) -> Rewrite {
    let mut document = document.clone();
    let replaced = if old == new {
        0
    } else {
        rewrite_in_place(&mut document, old, new)
    };
    Rewrite { document, replaced }
}

fn rewrite_in_place(value: &mut Value, old: &str, new: &str) -> usize {
    match value {
        Value::Object(map) => {
            let mut replaced = 0;
            if let Some(Value::Array(upstreams)) = map.get_mut("upstreams") {
                for upstream in upstreams.iter_mut() {
                    if let Some(dial) = upstream.get_mut("dial") {
                        if dial.as_str() == Some(old) {
                            *dial = Value::String(new.to_string());
                            replaced += 1;
                        }
                    }
                }
            }
            for child in map.values_mut() {
                replaced += rewrite_in_place(child, old, new);
            }
            replaced
        }
        Value::Array(items) => items
            .iter_mut()
            .map(|item| rewrite_in_place(item, old, new))
            .sum(),
        _ => 0,
    }
}

/// All upstream dial addresses in document order (duplicates kept).
pub fn upstream_dials(document: &Value) -> Vec<String> {
    let mut dials = Vec::new();
    collect_dials(document, &mut dials);
    dials
}

fn collect_dials(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(upstreams)) = map.get("upstreams") {
                out.extend(
                    upstreams
                        .iter()
                        .filter_map(|u| u.get("dial").and_then(Value::as_str))
                        .map(str::to_string),
                );
            }
            for child in map.values() {
                collect_dials(child, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_dials(item, out)),
        _ => {}
    }
}

//! The unified configuration tree
//!
//! All source documents are merged into one `serde_json::Value`. Merging is
//! commutative for compatible documents: maps combine key by key, equal values
//! collapse and a placeholder yields to any concrete value. Two different
//! concrete values at the same path are a conflict.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Key that overlays an environment on top of another node.
pub const INHERITS_KEY: &str = "inherits";

/// `null`, or a string such as `<required>` that a later layer must replace.
pub fn is_placeholder(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.len() >= 2 && s.starts_with('<') && s.ends_with('>'),
        _ => false,
    }
}

/// Unify `incoming` (from `document`) into `target`.
pub fn unify(target: &mut Value, incoming: Value, document: &str) -> Result<()> {
    unify_at(target, incoming, document, &mut Vec::new())
}

fn unify_at(
    target: &mut Value,
    incoming: Value,
    document: &str,
    path: &mut Vec<String>,
) -> Result<()> {
    if is_placeholder(&incoming) {
        return Ok(());
    }
    if is_placeholder(target) {
        *target = incoming;
        return Ok(());
    }

    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                path.push(key.clone());
                match existing.get_mut(&key) {
                    Some(slot) => unify_at(slot, value, document, path)?,
                    None => {
                        existing.insert(key, value);
                    }
                }
                path.pop();
            }
            Ok(())
        }
        (existing, incoming) if *existing == incoming => Ok(()),
        (existing, incoming) => Err(Error::Conflict {
            path: render_path(path),
            existing: existing.to_string(),
            incoming: incoming.to_string(),
            document: document.to_string(),
        }),
    }
}

/// Layer `child` on top of `parent`.
///
/// Maps merge recursively; lists and scalars from the child replace the
/// parent's. A placeholder in the child never hides a concrete parent value.
pub fn overlay(parent: &mut Value, child: Value) {
    match (parent, child) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, child) => {
            if !is_placeholder(&child) || is_placeholder(slot) {
                *slot = child;
            }
        }
    }
}

/// Look up a dotted path such as `staging` or `envs.staging`.
pub fn lookup<'a>(root: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// The `inherits` target of a node, if it names one.
pub fn parent_of(node: &Value) -> Option<&str> {
    node.get(INHERITS_KEY)
        .filter(|v| !is_placeholder(v))
        .and_then(Value::as_str)
}

/// Set `name` to `fallback` when it is missing or still a placeholder.
pub fn fill_name(node: &mut Map<String, Value>, fallback: &str) {
    let missing = node.get("name").is_none_or(is_placeholder);
    if missing {
        node.insert("name".to_string(), Value::String(fallback.to_string()));
    }
}

pub(crate) fn render_path(segments: &[String]) -> String {
    if segments.is_empty() {
        "<root>".to_string()
    } else {
        segments.join(".")
    }
}

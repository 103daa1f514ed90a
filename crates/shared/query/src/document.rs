//! Document representation and dotted-path helpers.

use serde_json::{Map, Value};

/// A stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Field holding the store-assigned identifier.
pub const ID_FIELD: &str = "_id";

/// Look up a dotted path (`"address.city"`) inside a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at a dotted path, creating intermediate objects as needed.
///
/// Returns `false` when an intermediate segment exists but is not an object,
/// in which case the document is left untouched.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> bool {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
            true
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(inner) => set_path(inner, rest, value),
                _ => false,
            }
        }
    }
}

/// Remove the value at a dotted path, returning it if present.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => match doc.get_mut(head)? {
            Value::Object(inner) => remove_path(inner, rest),
            _ => None,
        },
    }
}

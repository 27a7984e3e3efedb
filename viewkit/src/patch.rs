//! [JSON Merge Patch](https://datatracker.ietf.org/doc/html/rfc7396) support.
//!
//! Merge patches can only express whole-key presence/absence and whole-value
//! replacement. Arrays are always replaced in full, and a `null` in a patch
//! always means "remove this key", so a document containing explicit nulls
//! cannot be reproduced exactly.

use serde_json::{Map, Value as JsonValue};

/// Computes the merge patch that transforms `source` into `target`.
///
/// Returns an empty object if the two documents are equal.
pub fn create_merge_patch(source: &JsonValue, target: &JsonValue) -> JsonValue {
    match (source, target) {
        (JsonValue::Object(source), JsonValue::Object(target)) => {
            JsonValue::Object(diff_objects(source, target))
        }
        // Anything other than two objects can only be expressed as a full
        // replacement.
        _ => target.clone(),
    }
}

fn diff_objects(source: &Map<String, JsonValue>, target: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    let mut patch = Map::new();
    for (key, target_value) in target {
        match (source.get(key), target_value) {
            (Some(source_value), _) if source_value == target_value => {}
            (Some(JsonValue::Object(source_obj)), JsonValue::Object(target_obj)) => {
                let nested = diff_objects(source_obj, target_obj);
                if !nested.is_empty() {
                    patch.insert(key.clone(), JsonValue::Object(nested));
                }
            }
            _ => {
                patch.insert(key.clone(), target_value.clone());
            }
        }
    }
    for key in source.keys() {
        if !target.contains_key(key) {
            patch.insert(key.clone(), JsonValue::Null);
        }
    }
    patch
}

/// Applies the given merge patch to `target` in place.
pub fn apply_merge_patch(target: &mut JsonValue, patch: &JsonValue) {
    let patch = match patch {
        JsonValue::Object(patch) => patch,
        _ => {
            *target = patch.clone();
            return;
        }
    };
    if !target.is_object() {
        *target = JsonValue::Object(Map::new());
    }
    if let JsonValue::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                apply_merge_patch(target.entry(key.clone()).or_insert(JsonValue::Null), value);
            }
        }
    }
}

/// Returns `true` if the given patch would leave any document untouched.
pub fn is_empty_patch(patch: &JsonValue) -> bool {
    matches!(patch, JsonValue::Object(obj) if obj.is_empty())
}

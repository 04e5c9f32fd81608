//! JSON deep merge used by `merge` / `batch_merge`.
//!
//! Both the stored value and the incoming value are JSON text. Objects are
//! merged key by key, recursively; any other combination is resolved in
//! favour of the incoming value.

use serde_json::Value;

use crate::error::{StorageError, StorageResult};

/// Merges `patch` into `existing` and returns the re-serialized result.
///
/// An absent existing value (or a stored JSON `null`) yields the patch as-is.
///
/// # Errors
///
/// Returns [`StorageError::Serialization`] if either side is not valid JSON.
///
/// # Examples
///
/// ```
/// use async_kv_storage::merge::merge_json;
///
/// let merged = merge_json(Some(r#"{"a":{"x":1}}"#), r#"{"a":{"y":2},"b":3}"#).unwrap();
/// assert_eq!(merged, r#"{"a":{"x":1,"y":2},"b":3}"#);
/// ```
pub fn merge_json(existing: Option<&str>, patch: &str) -> StorageResult<String> {
    let patch: Value = serde_json::from_str(patch)
        .map_err(|e| StorageError::serialization_with_source("merge value is not valid JSON", e))?;

    let mut base = match existing {
        Some(text) => serde_json::from_str(text).map_err(|e| {
            StorageError::serialization_with_source("stored value is not valid JSON", e)
        })?,
        None => Value::Null,
    };

    deep_merge(&mut base, patch);

    serde_json::to_string(&base)
        .map_err(|e| StorageError::serialization_with_source("failed to encode merged value", e))
}

/// Recursively merges `patch` into `target` in place.
pub fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        target.insert(key, value);
                    },
                }
            }
        },
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::absent(None, r#"{"a":1}"#, json!({"a": 1}))]
    #[case::stored_null(Some("null"), r#"{"a":1}"#, json!({"a": 1}))]
    #[case::disjoint(Some(r#"{"a":1}"#), r#"{"b":2}"#, json!({"a": 1, "b": 2}))]
    #[case::overwrite_leaf(Some(r#"{"a":1}"#), r#"{"a":2}"#, json!({"a": 2}))]
    #[case::nested(
        Some(r#"{"a":{"x":1,"y":1}}"#),
        r#"{"a":{"y":2,"z":3}}"#,
        json!({"a": {"x": 1, "y": 2, "z": 3}})
    )]
    #[case::array_replaced(Some(r#"{"a":[1,2]}"#), r#"{"a":[3]}"#, json!({"a": [3]}))]
    #[case::scalar_replaced_by_object(Some("5"), r#"{"a":1}"#, json!({"a": 1}))]
    #[case::object_replaced_by_scalar(Some(r#"{"a":1}"#), "7", json!(7))]
    fn merges(#[case] existing: Option<&str>, #[case] patch: &str, #[case] expected: Value) {
        let merged = merge_json(existing, patch).unwrap();
        let merged: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(merged, expected);
    }

    #[test]
    fn invalid_patch_is_serialization_error() {
        let err = merge_json(Some("{}"), "not json").unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }), "got {err:?}");
    }

    #[test]
    fn invalid_stored_value_is_serialization_error() {
        let err = merge_json(Some("{broken"), "{}").unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }), "got {err:?}");
    }

    #[test]
    fn successive_merges_accumulate() {
        let first = merge_json(None, r#"{"a":1}"#).unwrap();
        let second = merge_json(Some(&first), r#"{"b":2}"#).unwrap();
        let value: Value = serde_json::from_str(&second).unwrap();
        assert_eq!(value, json!({"a": 1, "b": 2}));
    }
}

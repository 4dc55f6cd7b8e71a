//! Structural merge of a Trait's `patch` into a Component's rendered `output` (spec.md §4.2):
//! scalars overwrite, objects merge recursively, and list elements are matched either by
//! ordinal position or by a per-field key declared on the Definition via `+patchKey=<field>`.
use std::collections::HashMap;

use serde_json::Value;

use crate::error::{DuplicatePatchKeySnafu, Error};

/// How list elements at a given field path are matched between base and patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Match positionally: `patch[i]` merges into `base[i]`.
    Ordinal,
    /// Match by the value of `field` on each element; unmatched patch elements are appended.
    Key(String),
}

/// `path -> strategy`, built from a Definition's `+patchKey=<field>` annotations. A dotted JSON
/// path (no array indices) identifies the list field the strategy applies to.
pub type PatchKeys = HashMap<String, MergeStrategy>;

pub fn merge(base: &Value, patch: &Value, patch_keys: &PatchKeys) -> Result<Value, Error> {
    merge_at("", base, patch, patch_keys)
}

fn merge_at(path: &str, base: &Value, patch: &Value, patch_keys: &PatchKeys) -> Result<Value, Error> {
    match (base, patch) {
        (Value::Object(base_fields), Value::Object(patch_fields)) => {
            let mut merged = base_fields.clone();
            for (key, patch_value) in patch_fields {
                let field_path = join(path, key);
                let merged_value = match merged.get(key) {
                    Some(base_value) => merge_at(&field_path, base_value, patch_value, patch_keys)?,
                    None => patch_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Ok(Value::Object(merged))
        }
        (Value::Array(base_items), Value::Array(patch_items)) => {
            merge_array(path, base_items, patch_items, patch_keys)
        }
        // Scalars (and type mismatches) overwrite.
        (_, patch_value) => Ok(patch_value.clone()),
    }
}

fn merge_array(
    path: &str,
    base_items: &[Value],
    patch_items: &[Value],
    patch_keys: &PatchKeys,
) -> Result<Value, Error> {
    match patch_keys.get(path) {
        Some(MergeStrategy::Key(key_field)) => {
            merge_array_by_key(path, base_items, patch_items, key_field, patch_keys)
        }
        _ => merge_array_ordinal(path, base_items, patch_items, patch_keys),
    }
}

fn merge_array_ordinal(
    path: &str,
    base_items: &[Value],
    patch_items: &[Value],
    patch_keys: &PatchKeys,
) -> Result<Value, Error> {
    let mut merged = Vec::with_capacity(base_items.len().max(patch_items.len()));
    for index in 0..base_items.len().max(patch_items.len()) {
        match (base_items.get(index), patch_items.get(index)) {
            (Some(base_item), Some(patch_item)) => {
                merged.push(merge_at(path, base_item, patch_item, patch_keys)?)
            }
            (Some(base_item), None) => merged.push(base_item.clone()),
            (None, Some(patch_item)) => merged.push(patch_item.clone()),
            (None, None) => unreachable!(),
        }
    }
    Ok(Value::Array(merged))
}

fn merge_array_by_key(
    path: &str,
    base_items: &[Value],
    patch_items: &[Value],
    key_field: &str,
    patch_keys: &PatchKeys,
) -> Result<Value, Error> {
    let mut merged: Vec<Value> = base_items.to_vec();
    let mut seen_keys = std::collections::HashSet::new();

    for patch_item in patch_items {
        let Some(key_value) = patch_item.get(key_field) else {
            merged.push(patch_item.clone());
            continue;
        };
        if !seen_keys.insert(key_value.to_string()) {
            return DuplicatePatchKeySnafu {
                path: path.to_string(),
                key: key_value.to_string(),
            }
            .fail();
        }
        match merged
            .iter()
            .position(|existing| existing.get(key_field) == Some(key_value))
        {
            Some(existing_index) => {
                merged[existing_index] =
                    merge_at(path, &merged[existing_index], patch_item, patch_keys)?;
            }
            None => merged.push(patch_item.clone()),
        }
    }
    Ok(Value::Array(merged))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_patch_overwrites() {
        let base = json!({"replicas": 1});
        let patch = json!({"replicas": 3});
        assert_eq!(merge(&base, &patch, &PatchKeys::new()).unwrap(), json!({"replicas": 3}));
    }

    #[test]
    fn objects_merge_recursively() {
        let base = json!({"spec": {"replicas": 1, "image": "nginx"}});
        let patch = json!({"spec": {"replicas": 3}});
        let merged = merge(&base, &patch, &PatchKeys::new()).unwrap();
        assert_eq!(merged, json!({"spec": {"replicas": 3, "image": "nginx"}}));
    }

    #[test]
    fn ordinal_array_merge_is_default() {
        let base = json!({"containers": [{"name": "a", "image": "old"}]});
        let patch = json!({"containers": [{"image": "new"}]});
        let merged = merge(&base, &patch, &PatchKeys::new()).unwrap();
        assert_eq!(merged["containers"][0]["name"], json!("a"));
        assert_eq!(merged["containers"][0]["image"], json!("new"));
    }

    #[test]
    fn keyed_array_merge_matches_by_field() {
        let base = json!({"containers": [{"name": "a", "image": "old"}, {"name": "b", "image": "old"}]});
        let patch = json!({"containers": [{"name": "b", "image": "new"}]});
        let mut patch_keys = PatchKeys::new();
        patch_keys.insert("containers".to_string(), MergeStrategy::Key("name".to_string()));
        let merged = merge(&base, &patch, &patch_keys).unwrap();
        assert_eq!(merged["containers"][0]["image"], json!("old"));
        assert_eq!(merged["containers"][1]["image"], json!("new"));
    }

    #[test]
    fn duplicate_patch_key_is_an_error() {
        let base = json!({"containers": []});
        let patch = json!({"containers": [{"name": "a"}, {"name": "a"}]});
        let mut patch_keys = PatchKeys::new();
        patch_keys.insert("containers".to_string(), MergeStrategy::Key("name".to_string()));
        assert!(merge(&base, &patch, &patch_keys).is_err());
    }
}

//! Deep merge of nested configuration values.
//!
//! Mappings merge key by key; every other shape in the overlay replaces the
//! base outright. Sequences are never merged element-wise.

use serde_json::{Map, Value};

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans and nulls in overlay replace base
/// - Mismatched shapes (object vs scalar) resolve to the overlay
///
/// # Example
/// ```
/// use serde_json::json;
/// use hierconf::deep_merge;
///
/// let file = json!({
///     "database": { "host": "localhost", "port": 5984 },
///     "replicas": ["db1", "db2"]
/// });
/// let argv = json!({
///     "database": { "host": "127.0.0.1" },
///     "replicas": ["db3"]
/// });
/// assert_eq!(deep_merge(file, argv), json!({
///     "database": { "host": "127.0.0.1", "port": 5984 },
///     "replicas": ["db3"]
/// }));
/// ```
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    deep_merge_into(&mut base, overlay);
    base
}

/// In-place form of [`deep_merge`].
pub fn deep_merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge_into(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Folds from an empty mapping, so an empty iterator yields `{}`.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Map::new()), deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overlay_keys_win_and_base_keys_stay() {
        let defaults = json!({"title": "My generic title", "color": "red"});
        let user = json!({"color": "green", "movie": "Kill Bill"});
        assert_eq!(
            deep_merge(defaults, user),
            json!({"title": "My generic title", "color": "green", "movie": "Kill Bill"})
        );
    }

    #[test]
    fn test_merge_nested_objects() {
        let base = json!({
            "candy": {"something": "file1", "something5": {"first": 1, "second": 2}},
            "apples": true
        });
        let overlay = json!({
            "candy": {"something": "foo", "something5": {"second": "bar"}}
        });
        let result = deep_merge(base, overlay);
        assert_eq!(
            result,
            json!({
                "candy": {"something": "foo", "something5": {"first": 1, "second": "bar"}},
                "apples": true
            })
        );
    }

    #[test]
    fn test_sequences_replace_wholesale() {
        let file = json!({"database": {"replicas": ["db1", "db2", "db3"]}});
        let env = json!({"database": {"replicas": ["db9"]}});
        assert_eq!(
            deep_merge(file, env),
            json!({"database": {"replicas": ["db9"]}})
        );
    }

    #[test]
    fn test_null_overlay_wins() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let overlay = json!({"a": null, "b": null});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": null, "b": null}));
    }

    #[test]
    fn test_mapping_overlay_replaces_scalar() {
        let defaults = json!({"candy": "none"});
        let file = json!({"candy": {"something": "foo"}});
        assert_eq!(
            deep_merge(defaults, file),
            json!({"candy": {"something": "foo"}})
        );
    }

    #[test]
    fn test_scalar_overlay_replaces_mapping() {
        let file = json!({"database": {"host": "127.0.0.1", "port": 5984}});
        let argv = json!({"database": "disabled"});
        assert_eq!(deep_merge(file, argv), json!({"database": "disabled"}));
    }

    #[test]
    fn test_merge_keeps_base_key_order() {
        let base = json!({"z": 1, "a": 2});
        let overlay = json!({"m": 3, "z": 4});
        let result = deep_merge(base, overlay);
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_merge_idempotent() {
        let tree = json!({
            "a": {"b": [1, 2], "c": {"d": null}},
            "e": "text",
            "f": 1.5
        });
        assert_eq!(deep_merge(tree.clone(), tree.clone()), tree);
    }

    #[test]
    fn test_merge_fold_matches_nested_calls() {
        let a = json!({"x": {"y": 1, "z": 1}, "list": [1]});
        let b = json!({"x": {"y": 2}, "only_b": true});
        let c = json!({"x": {"z": 3}, "list": [3]});

        let folded = deep_merge_all(vec![a.clone(), b.clone(), c.clone()]);
        let nested = deep_merge(deep_merge(a, b), c);
        assert_eq!(folded, nested);
        assert_eq!(
            folded,
            json!({"x": {"y": 2, "z": 3}, "list": [3], "only_b": true})
        );
    }

    #[test]
    fn test_merge_all_empty() {
        assert_eq!(deep_merge_all(Vec::new()), json!({}));
    }
}

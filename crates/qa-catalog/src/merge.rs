//! Fragment `extends` resolution (spec §3, §4.1).

use std::collections::BTreeMap;

use qa_core::AppError;
use serde_json::Value;

/// Resolve a tool document's `extends` list against the fragment table, then
/// overlay the tool body. `extends` is removed from the result.
pub fn resolve_tool_mapping(
    mapping: &Value,
    context: &str,
    fragments: &BTreeMap<String, Value>,
) -> Result<Value, AppError> {
    let mut merged = Value::Object(serde_json::Map::new());

    if let Some(extends) = mapping.get("extends") {
        let names = extends.as_array().ok_or_else(|| AppError::CatalogIntegrityError(
            format!("{context}: 'extends' must be an array of fragment names"),
        ))?;
        let mut seen = std::collections::BTreeSet::new();
        for name_value in names {
            let name = name_value.as_str().ok_or_else(|| AppError::CatalogIntegrityError(
                format!("{context}: 'extends' entries must be strings"),
            ))?;
            if !seen.insert(name.to_string()) {
                return Err(AppError::CatalogIntegrityError(format!(
                    "{context}: fragment '{name}' referenced multiple times in extends"
                )));
            }
            let fragment = fragments.get(name).ok_or_else(|| AppError::CatalogIntegrityError(
                format!("{context}: unknown fragment '{name}' referenced in extends"),
            ))?;
            merged = merge_json_objects(&merged, fragment);
        }
    }

    let mut overlay = mapping.clone();
    if let Value::Object(map) = &mut overlay {
        map.remove("extends");
    }
    Ok(merge_json_objects(&merged, &overlay))
}

/// Recursive deep merge: maps merge key-wise; when both sides of a key are
/// arrays, the result is their order-preserving union; any other type
/// conflict lets `overlay` win outright.
pub fn merge_json_objects(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing) if existing.is_object() && overlay_value.is_object() => {
                        merge_json_objects(existing, overlay_value)
                    }
                    Some(Value::Array(existing)) if overlay_value.is_array() => {
                        union_preserving_order(existing, overlay_value.as_array().unwrap())
                    }
                    _ => overlay_value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

fn union_preserving_order(base: &[Value], overlay: &[Value]) -> Value {
    let mut seen: Vec<Value> = Vec::new();
    for item in base.iter().chain(overlay.iter()) {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    Value::Array(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_json_objects_deep_merges_maps() {
        let base = json!({"a": {"x": 1, "y": 2}});
        let overlay = json!({"a": {"y": 3, "z": 4}});
        let merged = merge_json_objects(&base, &overlay);
        assert_eq!(merged, json!({"a": {"x": 1, "y": 3, "z": 4}}));
    }

    #[test]
    fn test_merge_json_objects_arrays_union_preserving_order() {
        let base = json!({"tags": ["a", "b"]});
        let overlay = json!({"tags": ["b", "c"]});
        let merged = merge_json_objects(&base, &overlay);
        assert_eq!(merged, json!({"tags": ["a", "b", "c"]}));
    }

    #[test]
    fn test_merge_json_objects_overlay_wins_on_type_conflict() {
        let base = json!({"value": {"nested": true}});
        let overlay = json!({"value": "scalar"});
        let merged = merge_json_objects(&base, &overlay);
        assert_eq!(merged, json!({"value": "scalar"}));
    }

    #[test]
    fn test_resolve_tool_mapping_merges_fragments_left_to_right() {
        let mut fragments = BTreeMap::new();
        fragments.insert("common".to_string(), json!({"timeout_seconds": 30, "env": {"A": "1"}}));
        fragments.insert("py".to_string(), json!({"env": {"B": "2"}}));

        let tool = json!({
            "extends": ["common", "py"],
            "name": "ruff",
            "env": {"C": "3"},
        });

        let resolved = resolve_tool_mapping(&tool, "ruff.json", &fragments).unwrap();
        assert_eq!(
            resolved,
            json!({
                "timeout_seconds": 30,
                "env": {"A": "1", "B": "2", "C": "3"},
                "name": "ruff",
            })
        );
    }

    #[test]
    fn test_resolve_tool_mapping_rejects_duplicate_extends() {
        let fragments = BTreeMap::new();
        let tool = json!({"extends": ["common", "common"], "name": "ruff"});
        let err = resolve_tool_mapping(&tool, "ruff.json", &fragments).unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }

    #[test]
    fn test_resolve_tool_mapping_rejects_unknown_fragment() {
        let fragments = BTreeMap::new();
        let tool = json!({"extends": ["missing"], "name": "ruff"});
        let err = resolve_tool_mapping(&tool, "ruff.json", &fragments).unwrap_err();
        assert!(matches!(err, AppError::CatalogIntegrityError(_)));
    }

    #[test]
    fn test_resolve_tool_mapping_without_extends() {
        let fragments = BTreeMap::new();
        let tool = json!({"name": "ruff"});
        let resolved = resolve_tool_mapping(&tool, "ruff.json", &fragments).unwrap();
        assert_eq!(resolved, json!({"name": "ruff"}));
    }
}

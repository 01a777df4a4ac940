//! JSON Schema (Draft 2020-12) validation of catalog documents (spec §4.1).

use std::path::Path;

use qa_core::AppError;
use serde_json::Value;

/// Validate `instance` against `schema`, surfacing the first violation as a
/// [`AppError::CatalogValidationError`] tagged with `source`.
pub fn validate_document(schema: &Value, instance: &Value, source: &Path) -> Result<(), AppError> {
    let validator = jsonschema::validator_for(schema).map_err(|err| AppError::CatalogValidationError {
        file: source.to_path_buf(),
        message: format!("invalid schema: {err}"),
    })?;

    if let Some(first) = validator.iter_errors(instance).next() {
        return Err(AppError::CatalogValidationError {
            file: source.to_path_buf(),
            message: first.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_document_passes_valid_instance() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}},
        });
        let instance = json!({"name": "ruff"});
        assert!(validate_document(&schema, &instance, Path::new("ruff.json")).is_ok());
    }

    #[test]
    fn test_validate_document_reports_missing_required_field() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "required": ["name"],
        });
        let instance = json!({});
        let err = validate_document(&schema, &instance, Path::new("ruff.json")).unwrap_err();
        match err {
            AppError::CatalogValidationError { file, .. } => {
                assert_eq!(file, Path::new("ruff.json"));
            }
            other => panic!("expected CatalogValidationError, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_document_reports_wrong_type() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": {"phase": {"type": "string"}},
        });
        let instance = json!({"phase": 42});
        assert!(validate_document(&schema, &instance, Path::new("ruff.json")).is_err());
    }
}

//! JSON Schema validation for analysis requests.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded request schema (loaded at compile time).
const REQUEST_SCHEMA_JSON: &str = include_str!("../../schema/analysis_request.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(REQUEST_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate a request JSON value against the schema.
///
/// Returns every violation found, each suffixed with its instance path.
pub fn validate_request_schema(request_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(request_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request_passes_schema() {
        let value = serde_json::json!({
            "analysisResult": {
                "analysisId": "abc-123",
                "events": [
                    {"score": 0.9, "lineNumber": 10, "matchedPattern": {"id": "CrashLoop", "severity": "high"}}
                ]
            },
            "providerConfig": {"providerId": "openai", "modelId": "gpt-4o"}
        });
        assert!(validate_request_schema(&value).is_ok());
    }

    #[test]
    fn test_missing_sections_fail() {
        let value = serde_json::json!({"analysisResult": {"analysisId": "a"}});
        let errors = validate_request_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_empty_analysis_id_fails() {
        let value = serde_json::json!({
            "analysisResult": {"analysisId": ""},
            "providerConfig": {"providerId": "x"}
        });
        let errors = validate_request_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("/analysisResult/analysisId")));
    }

    #[test]
    fn test_wrong_event_types_fail() {
        let value = serde_json::json!({
            "analysisResult": {
                "analysisId": "a",
                "events": [{"score": "high", "lineNumber": 1.5}]
            },
            "providerConfig": {"providerId": "x"}
        });
        let errors = validate_request_schema(&value).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}

//! Analysis request parsing from JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_request_schema;
use crate::types::{AnalysisResult, ProviderConfig};

/// Errors for malformed caller input.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to read request file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Request failed schema validation: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

/// Envelope for a single dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub analysis_result: AnalysisResult,
    pub provider_config: ProviderConfig,
}

impl AnalysisRequest {
    pub fn new(analysis_result: AnalysisResult, provider_config: ProviderConfig) -> Self {
        Self {
            analysis_result,
            provider_config,
        }
    }

    /// Parse a request from a JSON string, validating it against the schema.
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load a request from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Validate and deserialize an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RequestError> {
        if let Err(errors) = validate_request_schema(&value) {
            tracing::debug!(violations = errors.len(), "Request rejected by schema");
            return Err(RequestError::SchemaViolation(errors));
        }
        let request: Self = serde_json::from_value(value)?;
        request.validate()?;
        Ok(request)
    }

    /// Check invariants that hold for every dispatchable request.
    ///
    /// Requests built in code skip the schema, so this is re-checked at the
    /// dispatch boundary.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.analysis_result.analysis_id.trim().is_empty() {
            return Err(RequestError::Invalid(
                "analysisId must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a standalone provider configuration.
pub fn parse_provider_config(json: &str) -> Result<ProviderConfig, RequestError> {
    Ok(serde_json::from_str(json)?)
}

impl ProviderConfig {
    /// Load a provider configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let content = fs::read_to_string(path)?;
        parse_provider_config(&content)
    }
}

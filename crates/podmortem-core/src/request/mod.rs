//! Request envelope parsing and validation.
//!
//! Requests arrive as JSON and are checked against an embedded JSON Schema
//! before being deserialized, so malformed input is reported with paths
//! rather than as a single serde error.

mod parser;
mod schema;

pub use parser::{parse_provider_config, AnalysisRequest, RequestError};
pub use schema::validate_request_schema;

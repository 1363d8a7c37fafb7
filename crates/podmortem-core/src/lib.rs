//! # podmortem-core
//!
//! Deterministic building blocks for explaining pod failures.
//!
//! This crate holds everything that does not need a provider:
//! - the analysis/response data model shared with providers
//! - request envelope parsing with JSON Schema validation
//! - response correlation (enrichment)
//! - the pattern-based fallback explainer
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: the fallback explanation depends only on its input
//! 2. **No I/O**: apart from the explicit `from_json_file` helpers
//! 3. **No provider calls**: dispatching lives in `podmortem-runtime`
//!
//! ## Example
//!
//! ```rust
//! use podmortem_core::{build_explanation, AnalysisResult, Event};
//!
//! let analysis = AnalysisResult::new("abc-123")
//!     .with_event(Event::matched(0.9, 42, "OOMKilled", "critical"));
//!
//! let explanation = build_explanation(&analysis);
//! assert!(explanation.contains("OOMKilled"));
//! ```

pub mod fallback;
pub mod request;
pub mod types;

pub use fallback::{
    build_explanation, fallback_response, DEFAULT_FALLBACK_CONFIDENCE, FALLBACK_MODEL_ID,
    FALLBACK_PROCESSING_TIME, FALLBACK_PROVIDER_ID, METADATA_FALLBACK_REASON,
};
pub use request::{parse_provider_config, AnalysisRequest, RequestError};
pub use types::{
    AiResponse, AnalysisResult, Event, MatchedPattern, ProviderConfig, ValidationResult,
    METADATA_ANALYSIS_ID, METADATA_EVENT_COUNT,
};

//! Explanation provider abstractions.
//!
//! A provider wraps one external reasoning backend. The dispatcher only
//! relies on the [`ExplanationProvider`] contract and on the
//! transient/permanent split of [`ProviderError`].
//!
//! ## Security
//!
//! Providers that need credentials should use the [`secrets`] module.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use podmortem_core::{AiResponse, AnalysisResult, ProviderConfig, ValidationResult};

mod registry;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

pub use registry::{ProviderRegistry, RegistryError};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, ANTHROPIC_API_KEY_ENV, ANTHROPIC_PROVIDER_ID};

/// Errors from explanation providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid provider configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider temporarily unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Whether retrying the same call may succeed.
    ///
    /// Timeouts, rate limits, network errors and server-side (5xx) API
    /// errors are transient. Configuration, authentication and parse
    /// failures are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::HttpError(_)
            | ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Unavailable(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            ProviderError::ParseError(_)
            | ProviderError::AuthError
            | ProviderError::NotConfigured(_)
            | ProviderError::InvalidConfiguration(_) => false,
        }
    }
}

/// Provider abstraction allows swapping reasoning backends.
///
/// Implementations are registered once in a [`ProviderRegistry`] and
/// shared across concurrent requests, so they must be `Send + Sync`.
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    /// Produce an explanation for an analysis.
    ///
    /// Signal retryable failures with a transient [`ProviderError`];
    /// anything else is treated as permanent and not retried.
    async fn generate_explanation(
        &self,
        analysis: &AnalysisResult,
        config: &ProviderConfig,
    ) -> Result<AiResponse, ProviderError>;

    /// Check a configuration without generating anything.
    async fn validate_configuration(&self, config: &ProviderConfig) -> ValidationResult;

    /// Stable, non-empty identifier used as the registry key.
    fn provider_id(&self) -> &str;

    /// Human-readable description of this provider.
    fn description(&self) -> &str {
        "Explanation provider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(ProviderError::RateLimited { retry_after: None }.is_transient());
        assert!(ProviderError::HttpError("reset".into()).is_transient());
        assert!(ProviderError::Unavailable("overloaded".into()).is_transient());
        assert!(ProviderError::ApiError {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(!ProviderError::ApiError {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!ProviderError::AuthError.is_transient());
        assert!(!ProviderError::ParseError("eof".into()).is_transient());
        assert!(!ProviderError::NotConfigured("api key".into()).is_transient());
        assert!(!ProviderError::InvalidConfiguration("model".into()).is_transient());
    }
}

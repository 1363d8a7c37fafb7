//! Resilient dispatch of analysis requests to explanation providers.
//!
//! The dispatcher implements:
//! - Provider resolution through the [`ProviderRegistry`]
//! - Timeout, retry and circuit breaking via [`ResiliencePolicy`]
//! - Correlation of successful responses with their analysis
//! - Pattern-based fallback when the provider path is exhausted

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;

use podmortem_core::{
    fallback_response, AiResponse, AnalysisRequest, AnalysisResult, ProviderConfig,
    RequestError, ValidationResult, METADATA_FALLBACK_REASON,
};

use crate::config::DispatchConfig;
use crate::providers::{ProviderError, ProviderRegistry, RegistryError};
use crate::resilience::{CircuitState, ResiliencePolicy};

/// Errors surfaced by the strict entry points.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown AI provider: '{requested}'. Available providers: {known:?}")]
    UnknownProvider {
        requested: String,
        known: Vec<String>,
    },

    #[error("Provider '{provider_id}' failed after {attempts} attempt(s): {source}")]
    ProviderTransient {
        provider_id: String,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("Provider '{provider_id}' failed permanently: {source}")]
    ProviderPermanent {
        provider_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Circuit open for provider '{provider_id}', retry in {retry_in:?}")]
    CircuitOpen {
        provider_id: String,
        retry_in: Duration,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
}

impl DispatchError {
    /// Whether another attempt within the retry budget may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::ProviderTransient { .. })
    }

    /// Whether this error reflects bad caller input rather than a
    /// provider-side failure.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, DispatchError::InvalidRequest(_))
    }
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownProvider { requested, known } => {
                DispatchError::UnknownProvider { requested, known }
            }
        }
    }
}

/// The dispatcher routes analyses to providers.
///
/// # Architecture
/// - Registry: immutable after construction, shared via `Arc`
/// - Resilience: timeout per attempt, fixed-delay retry, per-provider
///   circuit breaker (the only shared mutable state)
/// - Fallback: deterministic explanation from `podmortem-core`
///
/// Requests run in parallel; the dispatcher takes no per-request lock.
pub struct AnalysisDispatcher {
    registry: Arc<ProviderRegistry>,
    policy: ResiliencePolicy,
    config: DispatchConfig,
}

impl AnalysisDispatcher {
    /// Create a new dispatcher.
    pub fn new(registry: Arc<ProviderRegistry>, config: DispatchConfig) -> Self {
        let policy = ResiliencePolicy::new(
            config.timeout,
            config.retry.clone(),
            config.circuit_breaker.clone(),
        );

        Self {
            registry,
            policy,
            config,
        }
    }

    /// Best-effort analysis of a request.
    ///
    /// Provider failures never reach the caller: they are replaced by a
    /// fallback response. Only malformed input is reported as an error.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AiResponse, DispatchError> {
        request.validate()?;
        Ok(self
            .analyze_failure(&request.analysis_result, &request.provider_config)
            .await)
    }

    /// Strict analysis of a request.
    ///
    /// Surfaces provider, circuit and lookup failures instead of
    /// substituting a fallback.
    pub async fn analyze_strict(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AiResponse, DispatchError> {
        request.validate()?;
        self.try_analyze_failure(&request.analysis_result, &request.provider_config)
            .await
    }

    /// Explain an analysis, falling back to the pattern-based explanation
    /// when the provider path is exhausted.
    pub async fn analyze_failure(
        &self,
        analysis: &AnalysisResult,
        config: &ProviderConfig,
    ) -> AiResponse {
        match self.try_analyze_failure(analysis, config).await {
            Ok(response) => response,
            Err(err) => self.fallback(analysis, config, &err),
        }
    }

    /// Explain an analysis through the provider path only.
    pub async fn try_analyze_failure(
        &self,
        analysis: &AnalysisResult,
        config: &ProviderConfig,
    ) -> Result<AiResponse, DispatchError> {
        let provider_id = config.provider_id.as_str();
        tracing::info!(
            analysis_id = %analysis.analysis_id,
            provider_id,
            "Starting AI analysis"
        );

        // Lookups that can never succeed skip retry and breaker accounting.
        let provider = self.registry.resolve(provider_id).map_err(|err| {
            tracing::error!(provider_id, error = %err, "Failed to get AI provider");
            DispatchError::from(err)
        })?;

        let started = Instant::now();
        let mut response = self
            .policy
            .execute(provider_id, || provider.generate_explanation(analysis, config))
            .await
            .inspect_err(|err| {
                tracing::error!(provider_id, error = %err, "AI provider call failed");
            })?;

        response.normalize_confidence();
        response.enrich(analysis, Utc::now());

        tracing::info!(
            analysis_id = %analysis.analysis_id,
            provider_id,
            elapsed = ?started.elapsed(),
            "Analysis completed successfully"
        );
        Ok(response)
    }

    /// Ids of every registered provider.
    pub fn list_available_providers(&self) -> Vec<String> {
        self.registry.provider_ids()
    }

    /// Check a provider configuration.
    ///
    /// Unknown providers yield an invalid result rather than an error.
    pub async fn validate_provider(&self, config: &ProviderConfig) -> ValidationResult {
        match self.registry.resolve(&config.provider_id) {
            Ok(provider) => provider.validate_configuration(config).await,
            Err(err) => {
                tracing::debug!(provider_id = %config.provider_id, "Validation for unknown provider");
                ValidationResult::invalid(
                    &config.provider_id,
                    format!("provider not found: {}", err),
                )
            }
        }
    }

    /// Circuit state for a provider id.
    pub fn circuit_state(&self, provider_id: &str) -> CircuitState {
        self.policy.circuit_state(provider_id)
    }

    /// Close all circuits.
    pub fn reset_circuits(&self) {
        self.policy.reset_circuits();
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn fallback(
        &self,
        analysis: &AnalysisResult,
        config: &ProviderConfig,
        err: &DispatchError,
    ) -> AiResponse {
        tracing::warn!(
            analysis_id = %analysis.analysis_id,
            provider_id = %config.provider_id,
            reason = %err,
            "Using fallback explanation"
        );

        let mut response =
            fallback_response(analysis, self.config.fallback.confidence, Utc::now());
        response
            .metadata
            .insert(METADATA_FALLBACK_REASON.to_string(), err.to_string().into());
        response
    }
}

/// Builder for AnalysisDispatcher.
pub struct AnalysisDispatcherBuilder {
    providers: Vec<Arc<dyn crate::providers::ExplanationProvider>>,
    config: DispatchConfig,
}

impl AnalysisDispatcherBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            config: DispatchConfig::default(),
        }
    }

    /// Add a provider. Later providers replace earlier ones with the same id.
    pub fn provider(mut self, provider: Arc<dyn crate::providers::ExplanationProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the dispatcher.
    pub fn build(self) -> Result<AnalysisDispatcher, crate::config::ConfigError> {
        self.config.validate()?;
        let registry = Arc::new(ProviderRegistry::register(self.providers));
        Ok(AnalysisDispatcher::new(registry, self.config))
    }
}

impl Default for AnalysisDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

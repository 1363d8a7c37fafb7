//! Anthropic Claude explanation provider.
//!
//! ## Configuration
//!
//! Settings are read from the request's [`ProviderConfig`]:
//! ```json
//! {
//!   "providerId": "anthropic",
//!   "api_key": "sk-ant-...",       // Optional, falls back to ANTHROPIC_API_KEY env
//!   "base_url": "https://...",     // Optional, custom API endpoint
//!   "model": "claude-sonnet-4-5",  // Optional
//!   "max_tokens": 1024             // Optional
//! }
//! ```
//!
//! ## Security
//!
//! The API key is loaded per call through [`ApiCredential`] and only
//! exposed when the request header is set.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use podmortem_core::{AiResponse, AnalysisResult, ProviderConfig, ValidationResult};

use super::secrets::ApiCredential;
use super::{ExplanationProvider, ProviderError};

/// Registry id of the Anthropic provider.
pub const ANTHROPIC_PROVIDER_ID: &str = "anthropic";

/// Environment variable name for Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const API_VERSION: &str = "2023-06-01";

/// Confidence reported for model-generated explanations.
const MODEL_CONFIDENCE: f64 = 0.85;

/// Events listed in the prompt; the rest are summarized by count.
const MAX_PROMPT_EVENTS: usize = 10;

const SYSTEM_PROMPT: &str = "You are a Kubernetes reliability engineer. Given the \
pattern analysis of a failed pod's logs, explain the most likely root cause in plain \
language and suggest concrete next steps. Be concise.";

const SETTING_API_KEY: &str = "api_key";
const SETTING_BASE_URL: &str = "base_url";
const SETTING_MODEL: &str = "model";
const SETTING_MAX_TOKENS: &str = "max_tokens";

/// Anthropic Claude provider.
///
/// Holds only the HTTP client; credentials and model selection come from
/// each request's configuration.
pub struct AnthropicProvider {
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider").finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    ///
    /// The client carries no timeout of its own; attempts are bounded by
    /// the dispatcher.
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::HttpError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn base_url(config: &ProviderConfig) -> &str {
        config
            .setting_str(SETTING_BASE_URL)
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn model(config: &ProviderConfig) -> &str {
        config.setting_str(SETTING_MODEL).unwrap_or(DEFAULT_MODEL)
    }

    fn max_tokens(config: &ProviderConfig) -> Result<u32, ProviderError> {
        match config.setting(SETTING_MAX_TOKENS) {
            None => Ok(DEFAULT_MAX_TOKENS),
            Some(value) => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ProviderError::InvalidConfiguration(format!(
                        "max_tokens must be a positive integer, got {value}"
                    ))
                }),
        }
    }
}

/// Render the analysis as the user message.
fn build_prompt(analysis: &AnalysisResult) -> String {
    let mut prompt = format!(
        "Analysis {} found {} event(s).\n",
        analysis.analysis_id,
        analysis.event_count()
    );

    for (i, event) in analysis.events.iter().take(MAX_PROMPT_EVENTS).enumerate() {
        let (pattern, severity) = match &event.matched_pattern {
            Some(p) => (
                p.id.as_deref().unwrap_or("unknown"),
                p.severity.as_deref().unwrap_or("unknown"),
            ),
            None => ("none", "unknown"),
        };
        prompt.push_str(&format!(
            "{}. line {} score {} pattern {} severity {}\n",
            i + 1,
            event.line_number,
            event.score,
            pattern,
            severity
        ));
    }

    if analysis.event_count() > MAX_PROMPT_EVENTS {
        prompt.push_str(&format!(
            "... and {} more event(s).\n",
            analysis.event_count() - MAX_PROMPT_EVENTS
        ));
    }

    prompt.push_str("Explain why the pod failed.");
    prompt
}

/// Map a non-success HTTP status to a provider error.
fn status_error(status: u16, message: String, retry_after: Option<Duration>) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthError,
        429 => ProviderError::RateLimited { retry_after },
        _ => ProviderError::ApiError { status, message },
    }
}

/// Anthropic API request format.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// Anthropic API response format.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl ExplanationProvider for AnthropicProvider {
    async fn generate_explanation(
        &self,
        analysis: &AnalysisResult,
        config: &ProviderConfig,
    ) -> Result<AiResponse, ProviderError> {
        let credential = ApiCredential::from_settings_or_env(
            config,
            SETTING_API_KEY,
            ANTHROPIC_API_KEY_ENV,
            "Anthropic API key",
        )?;
        let model = Self::model(config);
        let request = MessagesRequest {
            model,
            max_tokens: Self::max_tokens(config)?,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: build_prompt(analysis),
            }],
        };

        let started = Instant::now();

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(format!("{}/messages", Self::base_url(config)))
            .header("x-api-key", credential.expose())
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            // Error bodies are best effort; gateways may not return JSON.
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
            };
            return Err(status_error(status.as_u16(), message, retry_after));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let explanation = body
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if explanation.trim().is_empty() {
            return Err(ProviderError::ParseError("response contained no text".into()));
        }

        let mut response = AiResponse::new(ANTHROPIC_PROVIDER_ID, explanation)
            .with_model(body.model)
            .with_processing_time(started.elapsed())
            .with_confidence(MODEL_CONFIDENCE)
            .with_metadata("inputTokens", body.usage.input_tokens)
            .with_metadata("outputTokens", body.usage.output_tokens);
        if let Some(reason) = body.stop_reason {
            response = response.with_metadata("stopReason", reason);
        }

        tracing::debug!(
            analysis_id = %analysis.analysis_id,
            model,
            credential_source = %credential.source(),
            input_tokens = body.usage.input_tokens,
            output_tokens = body.usage.output_tokens,
            "Anthropic explanation generated"
        );
        Ok(response)
    }

    async fn validate_configuration(&self, config: &ProviderConfig) -> ValidationResult {
        if !ApiCredential::is_available(config, SETTING_API_KEY, ANTHROPIC_API_KEY_ENV) {
            return ValidationResult::invalid(
                ANTHROPIC_PROVIDER_ID,
                format!(
                    "Anthropic API key required: set '{}' in provider config or {} env",
                    SETTING_API_KEY, ANTHROPIC_API_KEY_ENV
                ),
            );
        }

        let base_url = Self::base_url(config);
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return ValidationResult::invalid(
                ANTHROPIC_PROVIDER_ID,
                "base_url must start with http:// or https://",
            );
        }

        if let Err(e) = Self::max_tokens(config) {
            return ValidationResult::invalid(ANTHROPIC_PROVIDER_ID, e.to_string());
        }

        ValidationResult::valid(ANTHROPIC_PROVIDER_ID)
    }

    fn provider_id(&self) -> &str {
        ANTHROPIC_PROVIDER_ID
    }

    fn description(&self) -> &str {
        "Anthropic Claude (Messages API)"
    }
}

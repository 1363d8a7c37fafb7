//! Core data model shared by the dispatcher and providers.
//!
//! Wire forms use camelCase field names so requests produced by the
//! log-analysis phase can be consumed without translation.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Metadata key carrying the correlated analysis identifier.
pub const METADATA_ANALYSIS_ID: &str = "analysisId";

/// Metadata key carrying the number of events in the analysis.
pub const METADATA_EVENT_COUNT: &str = "eventCount";

/// Output of the log/pattern-matching phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Unique identifier of the analysis run
    pub analysis_id: String,

    /// Events in chronological order (earliest first)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub events: Vec<Event>,
}

impl AnalysisResult {
    /// Create an analysis result with no events.
    pub fn new(analysis_id: impl Into<String>) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            events: Vec::new(),
        }
    }

    /// Append an event.
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Number of events detected.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// The chronologically earliest event, if any.
    pub fn first_event(&self) -> Option<&Event> {
        self.events.first()
    }
}

/// A single scored log event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Score assigned by the pattern matcher
    pub score: f64,

    /// Line in the source log
    pub line_number: i64,

    /// Pattern that matched this line, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<MatchedPattern>,
}

impl Event {
    /// An event without a matched pattern.
    pub fn unmatched(score: f64, line_number: i64) -> Self {
        Self {
            score,
            line_number,
            matched_pattern: None,
        }
    }

    /// An event tagged with a pattern.
    pub fn matched(
        score: f64,
        line_number: i64,
        id: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            score,
            line_number,
            matched_pattern: Some(MatchedPattern {
                id: Some(id.into()),
                severity: Some(severity.into()),
            }),
        }
    }
}

/// Failure pattern reference. Severity is opaque to this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPattern {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub severity: Option<String>,
}

/// Provider selection plus provider-specific settings.
///
/// Settings are kept as an open JSON map; only the selected provider
/// interprets them.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Which provider to dispatch to
    pub provider_id: String,

    /// Opaque provider settings (api keys, model names, endpoints, ...)
    #[serde(flatten)]
    pub settings: JsonMap<String, JsonValue>,
}

// Settings routinely carry credentials, so only the keys are printed.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_id", &self.provider_id)
            .field("settings", &self.settings.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderConfig {
    /// Config selecting a provider with no extra settings.
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            settings: JsonMap::new(),
        }
    }

    /// Add a provider setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Look up a raw setting.
    pub fn setting(&self, key: &str) -> Option<&JsonValue> {
        self.settings.get(key)
    }

    /// Look up a string setting.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(JsonValue::as_str)
    }
}

/// Explanation produced by a provider or by the fallback explainer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    /// Natural-language explanation
    pub explanation: String,

    /// Who actually produced the explanation (may be "fallback")
    pub provider_id: String,

    /// Backend model, if the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    pub generated_at: DateTime<Utc>,

    #[serde(with = "duration_millis")]
    pub processing_time: Duration,

    /// Confidence in [0, 1]
    pub confidence: f64,

    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
}

impl AiResponse {
    /// Create a response stamped with the current time.
    pub fn new(provider_id: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            explanation: explanation.into(),
            provider_id: provider_id.into(),
            model_id: None,
            generated_at: Utc::now(),
            processing_time: Duration::ZERO,
            confidence: 1.0,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_processing_time(mut self, processing_time: Duration) -> Self {
        self.processing_time = processing_time;
        self
    }

    /// Set confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self.normalize_confidence();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Force confidence into [0, 1]. Non-finite values become 0.
    pub fn normalize_confidence(&mut self) {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Correlate the response with the analysis it explains.
    ///
    /// Stamps `generated_at` and writes `analysisId` / `eventCount` into
    /// the metadata, overwriting only those two keys. Applying it twice
    /// yields the same correlation metadata.
    pub fn enrich(&mut self, analysis: &AnalysisResult, now: DateTime<Utc>) {
        self.generated_at = now;
        self.metadata.insert(
            METADATA_ANALYSIS_ID.to_string(),
            JsonValue::from(analysis.analysis_id.clone()),
        );
        self.metadata.insert(
            METADATA_EVENT_COUNT.to_string(),
            JsonValue::from(analysis.event_count()),
        );
    }
}

/// Outcome of checking a provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub provider_id: String,

    /// Human-readable reason, empty when valid
    #[serde(default)]
    pub message: String,
}

impl ValidationResult {
    pub fn valid(provider_id: impl Into<String>) -> Self {
        Self {
            valid: true,
            provider_id: provider_id.into(),
            message: String::new(),
        }
    }

    pub fn invalid(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            provider_id: provider_id.into(),
            message: message.into(),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

//! Pattern-based fallback explanations.
//!
//! Used when no provider explanation can be obtained. Everything here is
//! deterministic and performs no I/O.

use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::{AiResponse, AnalysisResult};

/// Provider id reported on fallback responses.
pub const FALLBACK_PROVIDER_ID: &str = "fallback";

/// Model id reported on fallback responses.
pub const FALLBACK_MODEL_ID: &str = "pattern-based";

/// Reduced confidence signalling a degraded explanation.
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 0.6;

/// Nominal processing time reported for fallback responses.
pub const FALLBACK_PROCESSING_TIME: Duration = Duration::from_millis(100);

/// Metadata key recording why the fallback was used.
pub const METADATA_FALLBACK_REASON: &str = "fallbackReason";

const EXPLANATION_PREFIX: &str = "Pod failure analysis (pattern-based fallback): ";
const NO_PATTERNS_DETECTED: &str =
    "No specific failure patterns were detected in the log analysis.";
const UNKNOWN: &str = "unknown";

/// Build a basic explanation from the earliest event.
///
/// Only the first event is described; any further events are summarised
/// as a count.
pub fn build_explanation(analysis: &AnalysisResult) -> String {
    let mut explanation = String::from(EXPLANATION_PREFIX);

    let Some(first) = analysis.first_event() else {
        explanation.push_str(NO_PATTERNS_DETECTED);
        return explanation;
    };

    // Writing to a String cannot fail.
    match &first.matched_pattern {
        Some(pattern) => {
            let _ = write!(
                explanation,
                "The pod appears to have failed due to pattern '{}' with severity {}. ",
                pattern.id.as_deref().unwrap_or(UNKNOWN),
                pattern.severity.as_deref().unwrap_or(UNKNOWN),
            );
        }
        None => {
            let _ = write!(
                explanation,
                // Debug keeps the fractional part: 1.0 renders as "1.0", not "1".
                "The pod appears to have failed with score {:?} at line {}. ",
                first.score, first.line_number,
            );
        }
    }

    let remaining = analysis.event_count().saturating_sub(1);
    if remaining > 0 {
        let _ = write!(
            explanation,
            "Additional {} event(s) were also detected.",
            remaining
        );
    }

    explanation
}

/// Build the degraded response returned when the provider path is exhausted.
///
/// The response is already correlated with the analysis (see
/// [`AiResponse::enrich`]).
pub fn fallback_response(
    analysis: &AnalysisResult,
    confidence: f64,
    now: DateTime<Utc>,
) -> AiResponse {
    let mut response = AiResponse::new(FALLBACK_PROVIDER_ID, build_explanation(analysis))
        .with_model(FALLBACK_MODEL_ID)
        .with_processing_time(FALLBACK_PROCESSING_TIME)
        .with_confidence(confidence);
    response.enrich(analysis, now);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, MatchedPattern, METADATA_ANALYSIS_ID, METADATA_EVENT_COUNT};
    use proptest::prelude::*;

    #[test]
    fn test_empty_events() {
        let explanation = build_explanation(&AnalysisResult::new("a"));
        assert_eq!(
            explanation,
            "Pod failure analysis (pattern-based fallback): \
             No specific failure patterns were detected in the log analysis."
        );
    }

    #[test]
    fn test_matched_pattern_single_event() {
        let analysis =
            AnalysisResult::new("a").with_event(Event::matched(0.9, 12, "OOMKilled", "critical"));
        let explanation = build_explanation(&analysis);

        assert!(explanation.contains("pattern 'OOMKilled' with severity critical."));
        assert!(!explanation.contains("Additional"));
    }

    #[test]
    fn test_pattern_with_missing_fields_reports_unknown() {
        let analysis = AnalysisResult::new("a").with_event(Event {
            score: 0.3,
            line_number: 5,
            matched_pattern: Some(MatchedPattern::default()),
        });
        let explanation = build_explanation(&analysis);

        assert!(explanation.contains("pattern 'unknown' with severity unknown."));
    }

    #[test]
    fn test_unmatched_event_cites_score_and_line() {
        let analysis = AnalysisResult::new("a")
            .with_event(Event::unmatched(0.75, 204))
            .with_event(Event::matched(0.9, 300, "CrashLoop", "high"));
        let explanation = build_explanation(&analysis);

        assert!(explanation.contains("failed with score 0.75 at line 204."));
        assert!(explanation.ends_with("Additional 1 event(s) were also detected."));
        assert!(!explanation.contains("CrashLoop"));
    }

    #[test]
    fn test_whole_number_score_keeps_decimal_point() {
        let analysis = AnalysisResult::new("a").with_event(Event::unmatched(1.0, 5));
        let explanation = build_explanation(&analysis);

        assert!(explanation.contains("failed with score 1.0 at line 5."));
    }

    #[test]
    fn test_fallback_response_shape() {
        let analysis = AnalysisResult::new("abc-123")
            .with_event(Event::matched(0.8, 10, "CrashLoop", "high"));
        let now = Utc::now();
        let response = fallback_response(&analysis, DEFAULT_FALLBACK_CONFIDENCE, now);

        assert_eq!(response.provider_id, "fallback");
        assert_eq!(response.model_id.as_deref(), Some("pattern-based"));
        assert_eq!(response.confidence, 0.6);
        assert_eq!(response.processing_time, Duration::from_millis(100));
        assert_eq!(response.generated_at, now);
        assert!(response.explanation.contains("CrashLoop"));
        assert!(response.explanation.contains("high"));
        assert_eq!(response.metadata[METADATA_ANALYSIS_ID], "abc-123");
        assert_eq!(response.metadata[METADATA_EVENT_COUNT], 1);
    }

    fn arb_event() -> impl Strategy<Value = Event> {
        (
            0.0f64..1.0,
            0i64..100_000,
            proptest::option::of(("[a-z]{1,12}", "low|medium|high|critical")),
        )
            .prop_map(|(score, line, pattern)| match pattern {
                Some((id, severity)) => Event::matched(score, line, id, severity),
                None => Event::unmatched(score, line),
            })
    }

    proptest! {
        #[test]
        fn prop_mentions_remaining_event_count(events in proptest::collection::vec(arb_event(), 2..40)) {
            let n = events.len();
            let analysis = AnalysisResult { analysis_id: "p".into(), events };
            let explanation = build_explanation(&analysis);
            let expected = format!("Additional {} event(s) were also detected.", n - 1);
            prop_assert!(explanation.ends_with(&expected));
            prop_assert_eq!(explanation.matches("Additional").count(), 1);
        }

        #[test]
        fn prop_oomkilled_first_event_named(rest in proptest::collection::vec(arb_event(), 0..10)) {
            let mut events = vec![Event::matched(0.99, 1, "OOMKilled", "critical")];
            events.extend(rest);
            let analysis = AnalysisResult { analysis_id: "p".into(), events };
            let explanation = build_explanation(&analysis);
            prop_assert!(explanation.contains("OOMKilled"));
            prop_assert!(explanation.contains("critical"));
        }

        #[test]
        fn prop_deterministic(events in proptest::collection::vec(arb_event(), 0..10)) {
            let analysis = AnalysisResult { analysis_id: "p".into(), events };
            prop_assert_eq!(build_explanation(&analysis), build_explanation(&analysis));
        }
    }
}

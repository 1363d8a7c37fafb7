//! Analyze command: explain an analysis request.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use podmortem_core::AnalysisRequest;
use podmortem_runtime::AnalysisDispatcher;

/// Explain the request at `request_path` and print the response as JSON.
///
/// Without `strict`, provider failures yield the fallback explanation and
/// only an unreadable or invalid request is an error.
pub async fn run<W: Write>(
    writer: &mut W,
    dispatcher: &AnalysisDispatcher,
    request_path: &Path,
    strict: bool,
) -> Result<()> {
    let request = AnalysisRequest::from_json_file(request_path)
        .with_context(|| format!("failed to load request {}", request_path.display()))?;

    let response = if strict {
        dispatcher
            .analyze_strict(&request)
            .await
            .context("analysis failed")?
    } else {
        dispatcher
            .analyze(&request)
            .await
            .context("invalid analysis request")?
    };

    serde_json::to_writer_pretty(&mut *writer, &response)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use podmortem_runtime::AnalysisDispatcherBuilder;

    const REQUEST: &str = r#"{
        "analysisResult": {
            "analysisId": "abc-123",
            "events": [
                {"score": 0.8, "lineNumber": 17, "matchedPattern": {"id": "CrashLoop", "severity": "high"}}
            ]
        },
        "providerConfig": {"providerId": "x"}
    }"#;

    fn write_request(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("request.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn analyze_unknown_provider_prints_fallback() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_request(&temp, REQUEST);
        let dispatcher = AnalysisDispatcherBuilder::new().build().unwrap();

        let mut out = Vec::new();
        run(&mut out, &dispatcher, &path, false).await.unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["providerId"], "fallback");
        assert_eq!(json["modelId"], "pattern-based");
        assert_eq!(json["confidence"], 0.6);
        assert_eq!(json["metadata"]["analysisId"], "abc-123");
        assert!(json["explanation"].as_str().unwrap().contains("CrashLoop"));
    }

    #[tokio::test]
    async fn analyze_strict_unknown_provider_fails() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_request(&temp, REQUEST);
        let dispatcher = AnalysisDispatcherBuilder::new().build().unwrap();

        let mut out = Vec::new();
        let err = run(&mut out, &dispatcher, &path, true).await.unwrap_err();

        assert!(out.is_empty());
        assert!(format!("{err:#}").contains("Unknown AI provider: 'x'"));
    }

    #[tokio::test]
    async fn analyze_rejects_schema_violation() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_request(&temp, r#"{"providerConfig": {"providerId": "x"}}"#);
        let dispatcher = AnalysisDispatcherBuilder::new().build().unwrap();

        let mut out = Vec::new();
        let err = run(&mut out, &dispatcher, &path, false).await.unwrap_err();
        assert!(err.to_string().contains("failed to load request"));
    }
}

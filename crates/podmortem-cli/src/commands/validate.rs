//! Validate command: check a provider configuration.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use podmortem_core::ProviderConfig;
use podmortem_runtime::AnalysisDispatcher;

/// Print the validation result as JSON and return whether it was valid.
pub async fn run<W: Write>(
    writer: &mut W,
    dispatcher: &AnalysisDispatcher,
    config_path: &Path,
) -> Result<bool> {
    let config = ProviderConfig::from_json_file(config_path)
        .with_context(|| format!("failed to load provider config {}", config_path.display()))?;

    let result = dispatcher.validate_provider(&config).await;

    serde_json::to_writer_pretty(&mut *writer, &result)?;
    writeln!(writer)?;
    Ok(result.valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podmortem_runtime::AnalysisDispatcherBuilder;

    #[tokio::test]
    async fn validate_unknown_provider_is_invalid() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("provider.json");
        std::fs::write(&path, r#"{"providerId": "x", "model": "m"}"#).unwrap();
        let dispatcher = AnalysisDispatcherBuilder::new().build().unwrap();

        let mut out = Vec::new();
        let valid = run(&mut out, &dispatcher, &path).await.unwrap();

        assert!(!valid);
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["providerId"], "x");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("provider not found: "));
    }

    #[tokio::test]
    async fn validate_missing_file_is_error() {
        let dispatcher = AnalysisDispatcherBuilder::new().build().unwrap();
        let mut out = Vec::new();

        assert!(run(&mut out, &dispatcher, Path::new("/nonexistent.json"))
            .await
            .is_err());
    }
}

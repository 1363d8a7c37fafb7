//! Subcommand implementations.

pub mod analyze;
pub mod config;
pub mod providers;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use podmortem_runtime::{
    AnalysisDispatcher, AnalysisDispatcherBuilder, DispatchConfig, ExplanationProvider,
};

/// Load dispatch configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<DispatchConfig> {
    let config = match path {
        Some(path) => DispatchConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => DispatchConfig::default(),
    };
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Providers compiled into this binary.
pub fn bundled_providers() -> Result<Vec<Arc<dyn ExplanationProvider>>> {
    #[allow(unused_mut)]
    let mut providers: Vec<Arc<dyn ExplanationProvider>> = Vec::new();

    #[cfg(feature = "anthropic")]
    providers.push(Arc::new(
        podmortem_runtime::AnthropicProvider::new()
            .context("failed to initialize anthropic provider")?,
    ));

    Ok(providers)
}

/// Build a dispatcher over the bundled providers.
pub fn build_dispatcher(config: DispatchConfig) -> Result<AnalysisDispatcher> {
    bundled_providers()?
        .into_iter()
        .fold(AnalysisDispatcherBuilder::new(), |builder, provider| {
            builder.provider(provider)
        })
        .config(config)
        .build()
        .context("invalid dispatch configuration")
}

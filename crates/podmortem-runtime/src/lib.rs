//! # podmortem-runtime
//!
//! Provider dispatch for podmortem.
//!
//! This crate routes an [`AnalysisResult`](podmortem_core::AnalysisResult)
//! to a registered explanation provider and guarantees a usable answer:
//!
//! - **Registry**: providers are registered once and looked up by id
//! - **Resilience**: every provider call is bounded by a timeout, retried
//!   on transient failure, and guarded by a per-provider circuit breaker
//! - **Fallback**: when the provider path is exhausted, the deterministic
//!   pattern-based explanation from `podmortem-core` is returned instead
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use podmortem_runtime::{AnalysisDispatcherBuilder, DispatchConfig};
//!
//! let dispatcher = AnalysisDispatcherBuilder::new()
//!     .provider(Arc::new(AnthropicProvider::new()?))
//!     .config(DispatchConfig::from_yaml_file("dispatch.yaml")?)
//!     .build()?;
//!
//! let response = dispatcher.analyze(&request).await?;
//! println!("{}", response.explanation);
//! ```
//!
//! ## Features
//!
//! - `anthropic`: Anthropic Claude provider (pulls in `reqwest`)
//! - `all-providers`: every bundled provider

pub mod config;
pub mod dispatcher;
pub mod providers;
pub mod resilience;

pub use config::{ConfigError, DispatchConfig, FallbackConfig};
pub use dispatcher::{AnalysisDispatcher, AnalysisDispatcherBuilder, DispatchError};
pub use providers::{
    ApiCredential, CredentialSource, ExplanationProvider, ProviderError, ProviderRegistry,
    RegistryError,
};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitOpen, CircuitState, ResiliencePolicy,
    RetryConfig,
};

#[cfg(feature = "anthropic")]
pub use providers::{AnthropicProvider, ANTHROPIC_API_KEY_ENV, ANTHROPIC_PROVIDER_ID};

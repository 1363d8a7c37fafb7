//! Registry of explanation providers.
//!
//! The registry is built once from every provider the embedding
//! application supplies and is immutable afterwards. Lookups need no
//! locking; share it behind an `Arc`.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::register([
//!     Arc::new(AnthropicProvider::new()) as Arc<dyn ExplanationProvider>,
//! ]);
//!
//! let provider = registry.resolve("anthropic")?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use super::ExplanationProvider;

/// Errors from provider lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown AI provider: '{requested}'. Available providers: {known:?}")]
    UnknownProvider {
        requested: String,
        known: Vec<String>,
    },
}

/// Immutable mapping from provider id to provider.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn ExplanationProvider>>,
}

impl ProviderRegistry {
    /// Build the registry from the full set of providers.
    ///
    /// If two providers report the same id, the one registered last wins
    /// and the earlier one is dropped. The outcome therefore depends on
    /// iteration order.
    pub fn register<I>(providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ExplanationProvider>>,
    {
        let mut map: BTreeMap<String, Arc<dyn ExplanationProvider>> = BTreeMap::new();

        for provider in providers {
            let id = provider.provider_id().to_string();
            if map.insert(id.clone(), provider).is_some() {
                tracing::warn!(provider_id = %id, "Duplicate AI provider id, replacing earlier registration");
            } else {
                tracing::info!(provider_id = %id, "Registered AI provider");
            }
        }

        tracing::info!(count = map.len(), "AI provider registry initialized");
        Self { providers: map }
    }

    /// Create a registry with no providers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a provider by id.
    pub fn resolve(&self, provider_id: &str) -> Result<Arc<dyn ExplanationProvider>, RegistryError> {
        self.providers
            .get(provider_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProvider {
                requested: provider_id.to_string(),
                known: self.provider_ids(),
            })
    }

    /// All registered providers, ordered by id.
    pub fn list(&self) -> Vec<Arc<dyn ExplanationProvider>> {
        self.providers.values().cloned().collect()
    }

    /// Check if a provider id is registered.
    pub fn is_available(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    /// Registered provider ids, sorted.
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_ids())
            .finish()
    }
}

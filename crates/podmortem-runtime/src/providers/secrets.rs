//! Secure credential handling for providers.
//!
//! Credentials usually arrive inside the opaque settings of a
//! [`ProviderConfig`], with an environment variable as fallback. Wrapping
//! them in [`ApiCredential`] keeps them out of `Debug`/`Display` output and
//! therefore out of logs.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::providers::secrets::ApiCredential;
//!
//! let cred = ApiCredential::from_settings_or_env(
//!     &config,
//!     "apiKey",
//!     "ANTHROPIC_API_KEY",
//!     "Anthropic API key",
//! )?;
//!
//! // Use in HTTP header (explicit exposure)
//! request.header("x-api-key", cred.expose());
//! ```

use podmortem_core::ProviderConfig;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from the request's provider configuration
    Config,
    /// Loaded from environment variable
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
        }
    }
}

/// A securely-stored API credential.
///
/// `Debug` and `Display` show `[REDACTED]`; the value is only reachable
/// through [`ApiCredential::expose`].
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a new credential from a string value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load credential from provider settings, falling back to an
    /// environment variable.
    ///
    /// Blank values count as missing.
    pub fn from_settings_or_env(
        config: &ProviderConfig,
        setting_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = config.setting_str(setting_key).filter(|v| !v.trim().is_empty()) {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        if let Ok(value) = std::env::var(env_var) {
            if !value.trim().is_empty() {
                return Ok(Self::new(value, CredentialSource::Environment, name));
            }
        }

        Err(ProviderError::NotConfigured(format!(
            "{} required: set '{}' in provider config or {} environment variable",
            name, setting_key, env_var
        )))
    }

    /// Check if a credential is available (without loading it).
    pub fn is_available(config: &ProviderConfig, setting_key: &str, env_var: &str) -> bool {
        config
            .setting_str(setting_key)
            .is_some_and(|v| !v.trim().is_empty())
            || std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty())
    }

    /// Expose the credential value for use in API calls.
    ///
    /// Only call this at the point where the credential is actually needed
    /// (e.g., setting an HTTP header). Never store the exposed value.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Test API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Test API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("[REDACTED]"));
        assert!(display.contains("Test API key"));
        assert!(display.contains("config"));
    }

    #[test]
    fn test_credential_expose() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Test API key");

        assert_eq!(cred.expose(), secret);
    }

    #[test]
    fn test_from_settings_prefers_config() {
        let config = ProviderConfig::new("anthropic").with_setting("apiKey", "config-key");

        std::env::set_var("PODMORTEM_TEST_KEY_PRIORITY", "env-key");
        let cred = ApiCredential::from_settings_or_env(
            &config,
            "apiKey",
            "PODMORTEM_TEST_KEY_PRIORITY",
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);

        std::env::remove_var("PODMORTEM_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_from_settings_falls_back_to_env() {
        let config = ProviderConfig::new("anthropic").with_setting("apiKey", "  ");

        std::env::set_var("PODMORTEM_TEST_KEY_FALLBACK", "env-key");
        let cred = ApiCredential::from_settings_or_env(
            &config,
            "apiKey",
            "PODMORTEM_TEST_KEY_FALLBACK",
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);

        std::env::remove_var("PODMORTEM_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_from_settings_error_when_missing() {
        let config = ProviderConfig::new("anthropic");

        let err = ApiCredential::from_settings_or_env(
            &config,
            "apiKey",
            "PODMORTEM_NONEXISTENT_VAR_12345",
            "Test key",
        )
        .unwrap_err();

        assert!(!err.is_transient());
        assert!(err.to_string().contains("Test key"));
        assert!(err.to_string().contains("apiKey"));
        assert!(err.to_string().contains("PODMORTEM_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_is_available() {
        let config = ProviderConfig::new("anthropic").with_setting("apiKey", "value");

        assert!(ApiCredential::is_available(&config, "apiKey", "PODMORTEM_NONEXISTENT"));
        assert!(!ApiCredential::is_available(
            &ProviderConfig::new("anthropic"),
            "apiKey",
            "PODMORTEM_NONEXISTENT"
        ));
    }
}

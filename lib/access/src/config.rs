//! Configuration for federated credential verification.
//!
//! The verifier trusts a single federated identity provider, identified
//! by its issuer URL and this deployment's registered client id
//! (audience). Provider keys are fetched from the configured JWKS
//! endpoint.

use serde::{Deserialize, Serialize};

/// Configuration for the ID token verifier.
///
/// Fields with defaults can be omitted when loading from environment
/// variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// The trusted issuer (e.g. "https://accounts.google.com").
    issuer: String,
    /// This deployment's registered client identifier.
    audience: String,
    /// Where the provider publishes its signing keys.
    /// Default: Google's JWKS endpoint.
    #[serde(default = "default_jwks_url")]
    jwks_url: String,
    /// Restrict sign-in to emails in this domain (e.g. "brown.edu").
    /// No restriction when unset.
    #[serde(default)]
    required_email_domain: Option<String>,
    /// Clock skew tolerance for `exp`/`iat` checks, in seconds.
    /// Default: 60.
    #[serde(default = "default_leeway_seconds")]
    leeway_seconds: u64,
}

fn default_jwks_url() -> String {
    "https://www.googleapis.com/oauth2/v3/certs".to_string()
}

fn default_leeway_seconds() -> u64 {
    60
}

impl VerifierConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(issuer: String, audience: String) -> Self {
        Self {
            issuer,
            audience,
            jwks_url: default_jwks_url(),
            required_email_domain: None,
            leeway_seconds: default_leeway_seconds(),
        }
    }

    /// Sets the email domain restriction.
    #[must_use]
    pub fn with_required_email_domain(mut self, domain: Option<String>) -> Self {
        self.required_email_domain = domain;
        self
    }

    /// Sets the JWKS endpoint URL.
    #[must_use]
    pub fn with_jwks_url(mut self, url: String) -> Self {
        self.jwks_url = url;
        self
    }

    /// Sets the clock skew tolerance.
    #[must_use]
    pub fn with_leeway_seconds(mut self, leeway: u64) -> Self {
        self.leeway_seconds = leeway;
        self
    }

    /// Returns the trusted issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the expected audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Returns the JWKS endpoint URL.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Returns the email domain restriction, if configured.
    #[must_use]
    pub fn required_email_domain(&self) -> Option<&str> {
        self.required_email_domain.as_deref()
    }

    /// Returns the clock skew tolerance in seconds.
    #[must_use]
    pub fn leeway_seconds(&self) -> u64 {
        self.leeway_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_has_defaults() {
        let config = VerifierConfig::new(
            "https://accounts.google.com".to_string(),
            "hours-web".to_string(),
        );

        assert_eq!(config.issuer(), "https://accounts.google.com");
        assert_eq!(config.audience(), "hours-web");
        assert_eq!(config.jwks_url(), "https://www.googleapis.com/oauth2/v3/certs");
        assert!(config.required_email_domain().is_none());
        assert_eq!(config.leeway_seconds(), 60);
    }

    #[test]
    fn builder_style_customization() {
        let config = VerifierConfig::new(
            "https://accounts.google.com".to_string(),
            "hours-web".to_string(),
        )
        .with_required_email_domain(Some("brown.edu".to_string()))
        .with_leeway_seconds(5);

        assert_eq!(config.required_email_domain(), Some("brown.edu"));
        assert_eq!(config.leeway_seconds(), 5);
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "issuer": "https://accounts.google.com",
            "audience": "hours-web"
        }"#;

        let config: VerifierConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.audience(), "hours-web");
        assert!(config.required_email_domain().is_none());
        assert_eq!(config.leeway_seconds(), 60);
    }

    #[test]
    fn deserializes_domain_restriction() {
        let json = r#"{
            "issuer": "https://accounts.google.com",
            "audience": "hours-web",
            "required_email_domain": "brown.edu"
        }"#;

        let config: VerifierConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.required_email_domain(), Some("brown.edu"));
    }
}

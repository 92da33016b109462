//! Remote provider key cache.
//!
//! Fetches the identity provider's JWKS document and caches the decoded
//! verification keys in memory. The verifier reads from the cache
//! synchronously; a background task refreshes it on an interval so key
//! rotation at the provider picks up without a restart.

use hours_access::{KeyStore, StoreError, VerificationKey};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::RwLock;

/// JWKS document as published by the provider.
#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// A single published key. Only RSA keys are used; others are skipped.
#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    kid: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

impl Jwk {
    /// Decodes the JWK into a verification key, skipping unusable
    /// entries rather than failing the whole set.
    fn decode(&self) -> Option<(String, Algorithm, DecodingKey)> {
        if self.kty != "RSA" {
            tracing::debug!(kty = %self.kty, kid = %self.kid, "skipping non-RSA provider key");
            return None;
        }
        let (n, e) = match (&self.n, &self.e) {
            (Some(n), Some(e)) => (n, e),
            _ => {
                tracing::warn!(kid = %self.kid, "RSA key missing modulus or exponent");
                return None;
            }
        };
        let alg = self
            .alg
            .as_deref()
            .and_then(|a| Algorithm::from_str(a).ok())
            .unwrap_or(Algorithm::RS256);
        match DecodingKey::from_rsa_components(n, e) {
            Ok(key) => Some((self.kid.clone(), alg, key)),
            Err(err) => {
                tracing::warn!(kid = %self.kid, error = %err, "failed to decode provider key");
                None
            }
        }
    }
}

/// Key store backed by the provider's JWKS endpoint.
pub struct RemoteKeyStore {
    jwks_url: String,
    client: reqwest::Client,
    cached: RwLock<Vec<(String, Algorithm, DecodingKey)>>,
}

impl RemoteKeyStore {
    /// Creates a key store with an empty cache. Call [`refresh`] before
    /// serving traffic.
    ///
    /// [`refresh`]: RemoteKeyStore::refresh
    #[must_use]
    pub fn new(jwks_url: String) -> Self {
        Self {
            jwks_url,
            client: reqwest::Client::new(),
            cached: RwLock::new(Vec::new()),
        }
    }

    /// Fetches the JWKS document and replaces the cached keys.
    ///
    /// The previous cache is kept on failure, so a flaky provider does
    /// not invalidate keys that were good a moment ago.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the fetch or parse fails.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let jwks: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| StoreError::new(format!("JWKS fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| StoreError::new(format!("JWKS fetch failed: {e}")))?
            .json()
            .await
            .map_err(|e| StoreError::new(format!("JWKS parse failed: {e}")))?;

        let keys: Vec<_> = jwks.keys.iter().filter_map(Jwk::decode).collect();
        if keys.is_empty() {
            return Err(StoreError::new("JWKS document contained no usable keys"));
        }

        let count = keys.len();
        *self
            .cached
            .write()
            .map_err(|_| StoreError::new("key cache lock poisoned"))? = keys;
        tracing::info!(keys = count, "refreshed provider keys");
        Ok(())
    }
}

impl KeyStore for RemoteKeyStore {
    fn verification_keys(&self) -> Result<Vec<VerificationKey>, StoreError> {
        let cached = self
            .cached
            .read()
            .map_err(|_| StoreError::new("key cache lock poisoned"))?;
        if cached.is_empty() {
            return Err(StoreError::new("no provider keys cached"));
        }
        Ok(cached
            .iter()
            .map(|(kid, alg, key)| VerificationKey {
                kid: kid.clone(),
                alg: *alg,
                decoding_key: key.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn rsa_jwk(kid: &str, alg: Option<&str>) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            alg: alg.map(str::to_string),
            n: Some(URL_SAFE_NO_PAD.encode(b"test-modulus-bytes")),
            e: Some(URL_SAFE_NO_PAD.encode(b"\x01\x00\x01")),
        }
    }

    #[test]
    fn rsa_jwk_decodes_with_declared_algorithm() {
        let (kid, alg, _) = rsa_jwk("key-1", Some("RS384")).decode().expect("decode");
        assert_eq!(kid, "key-1");
        assert_eq!(alg, Algorithm::RS384);
    }

    #[test]
    fn missing_algorithm_defaults_to_rs256() {
        let (_, alg, _) = rsa_jwk("key-1", None).decode().expect("decode");
        assert_eq!(alg, Algorithm::RS256);
    }

    #[test]
    fn non_rsa_keys_are_skipped() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            kid: "key-2".to_string(),
            alg: None,
            n: None,
            e: None,
        };
        assert!(jwk.decode().is_none());
    }

    #[test]
    fn empty_cache_is_a_store_error() {
        let store = RemoteKeyStore::new("https://example.com/jwks".to_string());
        assert!(store.verification_keys().is_err());
    }
}

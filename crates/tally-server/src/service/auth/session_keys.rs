//! Signing keys for credentials.
//!
//! Both magic-link and session credentials are HS256 JSON Web Tokens signed
//! with a single process-wide secret. The keys are derived once at startup.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "config")]
use clap::Args;
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_SESSION_KEYS as TRACING_TARGET;
use crate::{Error, Result};

/// Secrets shorter than this are accepted but logged as weak.
const RECOMMENDED_SECRET_LEN: usize = 32;

/// Credential signing configuration.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct SessionKeysConfig {
    /// Secret used to sign and verify credentials.
    #[cfg_attr(
        feature = "config",
        arg(long = "jwt-secret", env = "JWT_SECRET", hide_env_values = true)
    )]
    #[serde(skip_serializing)]
    pub jwt_secret: String,
}

impl SessionKeysConfig {
    /// Creates a configuration with the given secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
        }
    }
}

impl fmt::Debug for SessionKeysConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeysConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

/// Keys used to sign and verify credentials.
///
/// Cheaply cloneable; clones share the same key material.
#[derive(Clone)]
pub struct SessionKeys {
    inner: Arc<SessionKeysInner>,
}

struct SessionKeysInner {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
}

impl SessionKeys {
    /// Derives the keys from the configured secret.
    ///
    /// An empty secret is a configuration error.
    pub fn from_config(config: &SessionKeysConfig) -> Result<Self> {
        Self::from_secret(&config.jwt_secret)
    }

    /// Derives the keys from a raw secret.
    pub fn from_secret(secret: &str) -> Result<Self> {
        if secret.trim().is_empty() {
            tracing::error!(
                target: TRACING_TARGET,
                "JWT_SECRET is empty",
            );
            return Err(Error::config("JWT_SECRET must not be empty"));
        }

        if secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                target: TRACING_TARGET,
                secret_len = secret.len(),
                recommended_len = RECOMMENDED_SECRET_LEN,
                "JWT_SECRET is shorter than recommended",
            );
        }

        let inner = SessionKeysInner {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        };

        tracing::info!(
            target: TRACING_TARGET,
            algorithm = "HS256",
            "Credential signing keys loaded",
        );

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the key used to verify credentials.
    #[inline]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.inner.decoding_key
    }

    /// Returns the key used to sign credentials.
    #[inline]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.inner.encoding_key
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn load_keys_from_secret() {
        let keys = SessionKeys::from_secret("a-sufficiently-long-test-secret-value");
        assert!(keys.is_ok());
    }

    #[test]
    fn reject_empty_secret() {
        let error = SessionKeys::from_config(&SessionKeysConfig::new("  ")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn accept_short_secret() {
        assert!(SessionKeys::from_secret("short").is_ok());
    }

    #[test]
    fn config_debug_redacts_secret() {
        let config = SessionKeysConfig::new("super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
    }
}

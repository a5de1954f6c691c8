//! Salted one-way hashing of login credentials using Argon2id.
//!
//! Only the hash of a magic-link credential is stored. Redemption compares
//! the presented credential against the stored hash, so a leaked store does
//! not yield usable links.

use std::sync::{Arc, OnceLock};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as ArgonError, SaltString};
use argon2::{Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier};

use crate::TRACING_TARGET_TOKEN_HASHER as TRACING_TARGET;
use crate::handler::{ErrorKind, Result};

/// Input hashed once to obtain the hash used by [`TokenHasher::verify_dummy_token`].
const DUMMY_CREDENTIAL: &str = "tally-dummy-credential";

/// Hashes and verifies login credentials.
///
/// Cheaply cloneable; clones share the lazily computed dummy hash.
#[derive(Debug, Clone)]
pub struct TokenHasher {
    argon2: Argon2<'static>,
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl TokenHasher {
    /// Creates a hasher with the default Argon2id parameters.
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// Creates a hasher with custom Argon2id cost parameters.
    pub fn with_params(params: Params) -> Self {
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
        Self {
            argon2,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Hashes a credential with a fresh random salt.
    ///
    /// Returns a PHC string that embeds the algorithm, parameters and salt.
    pub fn hash_token(&self, token: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let token_hash = self
            .argon2
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %e,
                    "Credential hashing failed"
                );

                ErrorKind::InternalServerError
                    .with_context("Hash generation error")
                    .with_resource("authentication")
            })?;

        Ok(token_hash.to_string())
    }

    /// Compares a credential against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only an unreadable hash is an error.
    pub fn verify_token(&self, token: &str, stored_hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                error = %e,
                "Stored credential hash is unreadable"
            );

            ErrorKind::InternalServerError
                .with_context("Hash format error")
                .with_resource("authentication")
        })?;

        match self.argon2.verify_password(token.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(ArgonError::Password) => Ok(false),
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %e,
                    "Credential verification error"
                );

                Err(ErrorKind::InternalServerError
                    .with_context("Verification error")
                    .with_resource("authentication"))
            }
        }
    }

    /// Performs one verification against a throwaway hash.
    ///
    /// Used when no stored hash exists so that the response takes as long
    /// as a real comparison. Always returns `false`.
    pub fn verify_dummy_token(&self, token: &str) -> bool {
        let dummy_hash = self
            .dummy_hash
            .get_or_init(|| self.hash_token(DUMMY_CREDENTIAL).ok());

        if let Some(dummy_hash) = dummy_hash {
            let _ = self.verify_token(token, dummy_hash);
        }

        false
    }
}

impl Default for TokenHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> TokenHasher {
        TokenHasher::with_params(Params::new(8, 1, 1, None).unwrap())
    }

    #[test]
    fn hash_and_verify_token() -> anyhow::Result<()> {
        let hasher = hasher();
        let hash = hasher.hash_token("header.payload.signature")?;

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_token("header.payload.signature", &hash)?);
        assert!(!hasher.verify_token("header.payload.other", &hash)?);
        Ok(())
    }

    #[test]
    fn hash_produces_unique_salts() -> anyhow::Result<()> {
        let hasher = hasher();
        let first = hasher.hash_token("credential")?;
        let second = hasher.hash_token("credential")?;

        assert_ne!(first, second);
        assert!(hasher.verify_token("credential", &first)?);
        assert!(hasher.verify_token("credential", &second)?);
        Ok(())
    }

    #[test]
    fn hash_never_contains_token() -> anyhow::Result<()> {
        let hash = hasher().hash_token("raw-magic-link-credential")?;
        assert!(!hash.contains("raw-magic-link-credential"));
        Ok(())
    }

    #[test]
    fn invalid_hash_is_internal_error() {
        let error = hasher().verify_token("credential", "not-a-phc-string").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InternalServerError);
    }

    #[test]
    fn dummy_verification_never_matches() {
        let hasher = hasher();
        assert!(!hasher.verify_dummy_token(DUMMY_CREDENTIAL));
        assert!(!hasher.verify_dummy_token("anything"));
    }
}

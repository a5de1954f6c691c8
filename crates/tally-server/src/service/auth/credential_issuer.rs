//! Signed, time-limited bearer credentials.
//!
//! A credential is an HS256 JSON Web Token whose audience encodes its
//! [`CredentialPurpose`]. Login credentials travel inside magic links and
//! live for one hour; session credentials authorize API requests and live
//! for seven days. A credential of one purpose never validates as the other.

use std::time::Duration;

use jiff::Timestamp;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tally_store::model::UserId;
use uuid::Uuid;

use super::SessionKeys;
use crate::TRACING_TARGET_CREDENTIALS as TRACING_TARGET;
use crate::handler::{Error, ErrorKind, Result};

/// What a credential may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
pub enum CredentialPurpose {
    /// Payload of an emailed magic link.
    #[strum(serialize = "login")]
    Login,
    /// Bearer credential of an authenticated session.
    #[strum(serialize = "session")]
    Session,
}

impl CredentialPurpose {
    /// Returns the JWT audience that identifies this purpose.
    pub const fn audience(self) -> &'static str {
        match self {
            Self::Login => "tally:login",
            Self::Session => "tally:session",
        }
    }

    /// Returns how long a credential of this purpose stays valid.
    pub const fn ttl(self) -> Duration {
        match self {
            Self::Login => Duration::from_secs(60 * 60),
            Self::Session => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Claims carried by every credential.
///
/// Timestamps are encoded as whole seconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialClaims {
    /// Issuer (who created the token).
    #[serde(rename = "iss")]
    issued_by: String,
    /// Audience, derived from the purpose.
    #[serde(rename = "aud")]
    audience: String,

    /// Unique identifier of this credential.
    #[serde(rename = "jti")]
    pub credential_id: Uuid,
    /// The user this credential represents.
    #[serde(rename = "sub")]
    pub user_id: UserId,

    /// Issued at.
    #[serde(rename = "iat", with = "jiff::fmt::serde::timestamp::second::required")]
    pub issued_at: Timestamp,
    /// Expiration time.
    #[serde(rename = "exp", with = "jiff::fmt::serde::timestamp::second::required")]
    pub expires_at: Timestamp,
}

impl CredentialClaims {
    /// Issuer identifier of every credential.
    const JWT_ISSUER: &str = "tally";

    /// Creates claims for `user_id` issued at `issued_at`.
    ///
    /// The expiry is `issued_at` plus the purpose's lifetime. Sub-second
    /// precision is dropped so the claims survive encoding unchanged.
    pub fn new(user_id: UserId, purpose: CredentialPurpose, issued_at: Timestamp) -> Self {
        let issued_at = Timestamp::from_second(issued_at.as_second()).unwrap_or(issued_at);
        let expires_at = issued_at
            .checked_add(purpose.ttl())
            .unwrap_or(Timestamp::MAX);

        Self {
            issued_by: Self::JWT_ISSUER.to_owned(),
            audience: purpose.audience().to_owned(),
            credential_id: Uuid::new_v4(),
            user_id,
            issued_at,
            expires_at,
        }
    }

    /// Replaces the generated credential identifier.
    #[must_use]
    pub fn with_credential_id(mut self, credential_id: Uuid) -> Self {
        self.credential_id = credential_id;
        self
    }

    /// Returns `true` if the credential has expired.
    #[inline]
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Timestamp::now()
    }
}

/// A freshly signed credential together with its claims.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// The encoded token.
    pub token: String,
    /// The claims it carries.
    pub claims: CredentialClaims,
}

/// Issues and decodes credentials.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    keys: SessionKeys,
}

impl CredentialIssuer {
    /// Creates an issuer signing with `keys`.
    pub fn new(keys: SessionKeys) -> Self {
        Self { keys }
    }

    /// Issues a credential of the given purpose for `user_id`, valid from now.
    pub fn issue(&self, user_id: UserId, purpose: CredentialPurpose) -> Result<IssuedCredential> {
        self.sign(CredentialClaims::new(user_id, purpose, Timestamp::now()))
    }

    /// Signs arbitrary claims.
    pub fn sign(&self, claims: CredentialClaims) -> Result<IssuedCredential> {
        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, self.keys.encoding_key()).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                error = %e,
                user_id = %claims.user_id,
                "Failed to encode credential"
            );

            ErrorKind::InternalServerError
                .with_context("Unable to sign credential")
                .with_resource("authentication")
        })?;

        tracing::debug!(
            target: TRACING_TARGET,
            user_id = %claims.user_id,
            credential_id = %claims.credential_id,
            audience = %claims.audience,
            expires_at = %claims.expires_at,
            "Credential issued"
        );

        Ok(IssuedCredential { token, claims })
    }

    /// Decodes and validates a credential of the given purpose.
    ///
    /// Fails with `401 Unauthorized` on a bad signature, a malformed token,
    /// the wrong purpose, or an expiry in the past.
    pub fn decode(&self, token: &str, purpose: CredentialPurpose) -> Result<CredentialClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.set_audience(&[purpose.audience()]);
        validation.set_issuer(&[CredentialClaims::JWT_ISSUER]);
        validation.set_required_spec_claims(&["iss", "aud", "jti", "sub", "iat", "exp"]);

        let claims = decode::<CredentialClaims>(token, self.keys.decoding_key(), &validation)
            .map_err(|e| {
                tracing::debug!(
                    target: TRACING_TARGET,
                    error = %e,
                    purpose = %purpose,
                    "Credential rejected"
                );
                Error::from(e)
            })?
            .claims;

        if claims.is_expired() {
            tracing::debug!(
                target: TRACING_TARGET,
                user_id = %claims.user_id,
                expired_at = %claims.expires_at,
                "Credential expired"
            );

            return Err(ErrorKind::Unauthorized
                .with_context("Credential has expired")
                .with_resource("authentication"));
        }

        Ok(claims)
    }
}

impl From<JwtError> for Error<'static> {
    fn from(error: JwtError) -> Self {
        match error.kind() {
            JwtErrorKind::ExpiredSignature => {
                ErrorKind::Unauthorized.with_context("Credential has expired")
            }
            JwtErrorKind::InvalidSignature => {
                ErrorKind::Unauthorized.with_context("Credential signature could not be verified")
            }
            JwtErrorKind::InvalidAudience => {
                ErrorKind::Unauthorized.with_context("Credential was issued for another purpose")
            }
            JwtErrorKind::InvalidIssuer => {
                ErrorKind::Unauthorized.with_context("Credential was not issued by this service")
            }
            JwtErrorKind::MissingRequiredClaim(claim) => ErrorKind::MalformedAuthToken
                .with_context(format!("Credential is missing required claim: {}", claim)),
            JwtErrorKind::InvalidToken
            | JwtErrorKind::InvalidAlgorithm
            | JwtErrorKind::Base64(_)
            | JwtErrorKind::Json(_)
            | JwtErrorKind::Utf8(_) => {
                ErrorKind::MalformedAuthToken.with_context("Credential is malformed")
            }
            _ => ErrorKind::Unauthorized.with_context("Credential validation failed"),
        }
        .with_resource("authentication")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> CredentialIssuer {
        CredentialIssuer::new(SessionKeys::from_secret(secret).unwrap())
    }

    #[test]
    fn issue_and_decode() -> anyhow::Result<()> {
        let issuer = issuer("test-secret-with-enough-length-0123");
        let user_id = UserId::new();

        let issued = issuer.issue(user_id, CredentialPurpose::Session)?;
        let claims = issuer.decode(&issued.token, CredentialPurpose::Session)?;

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.user_id, user_id);
        Ok(())
    }

    #[test]
    fn lifetimes_match_purpose() -> anyhow::Result<()> {
        let issuer = issuer("test-secret-with-enough-length-0123");
        let login = issuer.issue(UserId::new(), CredentialPurpose::Login)?.claims;
        let session = issuer.issue(UserId::new(), CredentialPurpose::Session)?.claims;

        let login_ttl = login.expires_at.as_second() - login.issued_at.as_second();
        let session_ttl = session.expires_at.as_second() - session.issued_at.as_second();
        assert_eq!(login_ttl, 3600);
        assert_eq!(session_ttl, 7 * 24 * 3600);
        Ok(())
    }

    #[test]
    fn purposes_are_not_interchangeable() -> anyhow::Result<()> {
        let issuer = issuer("test-secret-with-enough-length-0123");
        let login = issuer.issue(UserId::new(), CredentialPurpose::Login)?;

        let error = issuer
            .decode(&login.token, CredentialPurpose::Session)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        Ok(())
    }

    #[test]
    fn reject_foreign_signature() -> anyhow::Result<()> {
        let issued = issuer("first-secret-with-enough-length-0123")
            .issue(UserId::new(), CredentialPurpose::Session)?;

        let error = issuer("other-secret-with-enough-length-0123")
            .decode(&issued.token, CredentialPurpose::Session)
            .unwrap_err();
        assert_eq!(error.kind().status_code(), 401);
        Ok(())
    }

    #[test]
    fn reject_expired_credential() -> anyhow::Result<()> {
        let issuer = issuer("test-secret-with-enough-length-0123");
        let two_hours_ago = Timestamp::now().checked_sub(Duration::from_secs(2 * 3600))?;
        let claims = CredentialClaims::new(UserId::new(), CredentialPurpose::Login, two_hours_ago);

        let issued = issuer.sign(claims)?;
        let error = issuer
            .decode(&issued.token, CredentialPurpose::Login)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        Ok(())
    }

    #[test]
    fn reject_garbage() {
        let issuer = issuer("test-secret-with-enough-length-0123");
        let error = issuer
            .decode("not-a-jwt", CredentialPurpose::Session)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedAuthToken);
    }
}

//! `Authorization: Bearer` session credential extraction.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejectionReason;

use crate::TRACING_TARGET_AUTHENTICATION as TRACING_TARGET;
use crate::handler::{Error, ErrorKind, Result};
use crate::service::{CredentialClaims, CredentialIssuer, CredentialPurpose};

/// A decoded and verified session credential.
///
/// Verification covers the signature, the session purpose and the expiry.
/// It does not check that the user still exists; use [`AuthState`] for that.
///
/// The result is cached in the request extensions.
///
/// [`AuthState`]: crate::extract::AuthState
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    claims: CredentialClaims,
}

impl AuthHeader {
    /// Wraps already verified claims.
    #[inline]
    pub const fn new(claims: CredentialClaims) -> Self {
        Self { claims }
    }

    /// Returns a reference to the verified claims.
    #[inline]
    pub const fn as_claims(&self) -> &CredentialClaims {
        &self.claims
    }

    /// Consumes this header and returns the verified claims.
    #[inline]
    pub fn into_claims(self) -> CredentialClaims {
        self.claims
    }

    fn from_bearer(bearer: &Bearer, issuer: &CredentialIssuer) -> Result<Self> {
        let claims = issuer.decode(bearer.token(), CredentialPurpose::Session)?;
        Ok(Self::new(claims))
    }
}

impl<S> FromRequestParts<S> for AuthHeader
where
    S: Sync + Send,
    CredentialIssuer: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth_header) = parts.extensions.get::<Self>() {
            return Ok(auth_header.clone());
        }

        type AuthBearerHeader = TypedHeader<Authorization<Bearer>>;
        let issuer = CredentialIssuer::from_ref(state);

        match AuthBearerHeader::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                let auth_header = Self::from_bearer(&bearer, &issuer)?;

                tracing::trace!(
                    target: TRACING_TARGET,
                    user_id = %auth_header.claims.user_id,
                    credential_id = %auth_header.claims.credential_id,
                    "Session credential accepted"
                );

                parts.extensions.insert(auth_header.clone());
                Ok(auth_header)
            }
            Err(rejection) => {
                let error = match rejection.reason() {
                    TypedHeaderRejectionReason::Missing => ErrorKind::MissingAuthToken
                        .with_context("Missing Authorization header with Bearer token")
                        .with_resource("authentication"),
                    TypedHeaderRejectionReason::Error(_) => ErrorKind::MalformedAuthToken
                        .with_context("Authorization header must contain a valid Bearer token")
                        .with_resource("authentication"),
                    _ => ErrorKind::InternalServerError
                        .with_context("Unexpected error during header extraction")
                        .with_resource("authentication"),
                };

                tracing::debug!(
                    target: TRACING_TARGET,
                    error_kind = %error.kind(),
                    "Bearer credential rejected"
                );

                Err(error)
            }
        }
    }
}

impl aide::OperationInput for AuthHeader {}

#[cfg(test)]
mod tests {
    use axum::http::{Request, header};
    use tally_store::model::UserId;

    use super::*;
    use crate::service::SessionKeys;

    fn issuer() -> CredentialIssuer {
        CredentialIssuer::new(SessionKeys::from_secret("auth-header-test-secret-0123456789").unwrap())
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/polls");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn accept_session_credential() -> anyhow::Result<()> {
        let issuer = issuer();
        let user_id = UserId::new();
        let session = issuer.issue(user_id, CredentialPurpose::Session)?;

        let mut parts = parts(Some(&format!("Bearer {}", session.token)));
        let header = AuthHeader::from_request_parts(&mut parts, &issuer).await?;

        assert_eq!(header.as_claims().user_id, user_id);
        assert!(parts.extensions.get::<AuthHeader>().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn missing_header() {
        let mut parts = parts(None);
        let error = AuthHeader::from_request_parts(&mut parts, &issuer())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingAuthToken);
    }

    #[tokio::test]
    async fn wrong_scheme_is_malformed() {
        let mut parts = parts(Some("Basic dXNlcjpwYXNz"));
        let error = AuthHeader::from_request_parts(&mut parts, &issuer())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedAuthToken);
    }

    #[tokio::test]
    async fn login_credential_is_not_a_session() -> anyhow::Result<()> {
        let issuer = issuer();
        let login = issuer.issue(UserId::new(), CredentialPurpose::Login)?;

        let mut parts = parts(Some(&format!("Bearer {}", login.token)));
        let error = AuthHeader::from_request_parts(&mut parts, &issuer)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        Ok(())
    }
}

//! Authenticated user extractor.

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use derive_more::Deref;
use tally_store::model::User;
use tally_store::StoreClient;

use super::AuthHeader;
use crate::TRACING_TARGET_AUTHENTICATION as TRACING_TARGET;
use crate::handler::{Error, ErrorKind, Result};
use crate::service::CredentialIssuer;

/// The user behind a verified session credential.
///
/// Extraction fails with `401 Unauthorized` when the credential is missing,
/// invalid or expired, or when its user no longer exists. The resolved user
/// is cached in the request extensions, so the authentication middleware and
/// the handler share a single store lookup.
#[derive(Debug, Clone, Deref, PartialEq, Eq)]
pub struct AuthState(pub User);

impl AuthState {
    /// Resolves the user named by a verified credential.
    pub async fn from_verified_header(auth_header: AuthHeader, store: &StoreClient) -> Result<Self> {
        let claims = auth_header.into_claims();

        let Some(user) = store.find_user_by_id(claims.user_id).await? else {
            tracing::warn!(
                target: TRACING_TARGET,
                user_id = %claims.user_id,
                credential_id = %claims.credential_id,
                "Session credential names an unknown user"
            );

            return Err(ErrorKind::Unauthorized
                .with_context("Session user no longer exists")
                .with_resource("authentication"));
        };

        tracing::debug!(
            target: TRACING_TARGET,
            user_id = %user.id,
            "Request authenticated"
        );

        Ok(Self(user))
    }

    /// Returns the authenticated user.
    #[inline]
    pub fn into_user(self) -> User {
        self.0
    }
}

impl<S> FromRequestParts<S> for AuthState
where
    S: Sync + Send + 'static,
    StoreClient: FromRef<S>,
    CredentialIssuer: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth_state) = parts.extensions.get::<Self>() {
            return Ok(auth_state.clone());
        }

        let auth_header = AuthHeader::from_request_parts(parts, state).await?;
        let store = StoreClient::from_ref(state);
        let auth_state = Self::from_verified_header(auth_header, &store).await?;

        parts.extensions.insert(auth_state.clone());
        Ok(auth_state)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthState
where
    S: Sync + Send + 'static,
    StoreClient: FromRef<S>,
    CredentialIssuer: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <Self as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(auth_state) => Ok(Some(auth_state)),
            Err(_) => Ok(None),
        }
    }
}

impl aide::OperationInput for AuthState {}

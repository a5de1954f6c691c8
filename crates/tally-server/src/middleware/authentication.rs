//! Authentication middleware for validating request credentials.

use axum::Router;
use axum::extract::Request;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::Response;

use crate::extract::AuthState;
use crate::service::ServiceState;

/// Extension trait for `axum::`[`Router`] to apply authentication middleware.
pub trait RouterAuthExt<S> {
    /// Requires a valid session credential for all routes.
    ///
    /// Requests without a usable `Authorization: Bearer` header are rejected
    /// with `401 Unauthorized` before reaching the handler.
    fn with_authentication(self, state: ServiceState) -> Self;
}

impl<S> RouterAuthExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_authentication(self, state: ServiceState) -> Self {
        self.layer(from_fn_with_state(state, require_authentication))
    }
}

/// Requires a valid session credential to proceed with the request.
///
/// The resolved [`AuthState`] is cached in the request extensions, so the
/// handler behind this middleware does not look the user up again.
pub async fn require_authentication(
    AuthState(_): AuthState,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}

//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use aide::axum::ApiRouter;
//! use aide::axum::routing::get;
//! use tally_server::handler::{CustomRoutes, routes};
//! use tally_server::service::{ServiceConfig, ServiceState};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn custom_handler() -> &'static str {
//!     "Hello from custom route!"
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::new("memory://", "a-long-enough-signing-secret")?;
//! let state = ServiceState::from_config(&config, CancellationToken::new()).await?;
//!
//! let custom_routes = CustomRoutes::new()
//!     .add_public_routes(ApiRouter::new().api_route("/custom", get(custom_handler)));
//!
//! let router = routes(custom_routes, state.clone());
//! # Ok(())
//! # }
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod authentication;
mod error;
mod events;
mod monitors;
mod polls;
mod request;
mod response;
mod utility;

use aide::axum::ApiRouter;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::utility::{CustomRoutes, RouterMapFn};
use crate::middleware::require_authentication;
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns an [`ApiRouter`] with all private routes.
fn private_routes(
    additional_routes: Option<ApiRouter<ServiceState>>,
) -> ApiRouter<ServiceState> {
    let mut router = ApiRouter::new()
        .merge(authentication::private_routes())
        .merge(polls::private_routes());

    if let Some(additional) = additional_routes {
        router = router.merge(additional);
    }

    router
}

/// Returns an [`ApiRouter`] with all public routes.
fn public_routes(
    additional_routes: Option<ApiRouter<ServiceState>>,
    disable_authentication: bool,
) -> ApiRouter<ServiceState> {
    let mut router = ApiRouter::new()
        .merge(polls::public_routes())
        .merge(events::routes())
        .merge(monitors::routes());

    if !disable_authentication {
        router = router.merge(authentication::public_routes());
    }

    if let Some(additional) = additional_routes {
        router = router.merge(additional);
    }

    router
}

/// Returns an [`ApiRouter`] with all routes.
///
/// Private routes are guarded by [`require_authentication`]; requests that
/// match no route get a JSON `404`.
pub fn routes(mut routes: CustomRoutes, state: ServiceState) -> ApiRouter<ServiceState> {
    let require_authentication = from_fn_with_state(state, require_authentication);

    let private_router = private_routes(routes.take_private_routes());
    let private_router = routes.map_private_before_middleware(private_router);
    let private_router = private_router.route_layer(require_authentication);
    let private_router = routes.map_private_after_middleware(private_router);

    let public_router = public_routes(routes.take_public_routes(), routes.disable_authentication);
    let public_router = routes.map_public_middleware(public_router);

    ApiRouter::new()
        .merge(private_router)
        .merge(public_router)
        .fallback(handler)
}

#[cfg(test)]
pub(crate) mod test {
    use aide::axum::ApiRouter;
    use axum::Router;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use tally_mail::MemoryMailer;

    use crate::handler::{CustomRoutes, routes};
    use crate::service::ServiceState;
    use crate::service::test::memory_state;

    /// Returns a new [`TestServer`] with the given router.
    pub fn create_test_server_with_router(
        router: impl Fn(ServiceState) -> ApiRouter<ServiceState>,
    ) -> anyhow::Result<TestServer> {
        let (state, _) = memory_state()?;
        let router = router(state.clone());
        create_test_server_with_state(router, state)
    }

    /// Returns a new [`TestServer`] with the given router and state.
    pub fn create_test_server_with_state(
        router: ApiRouter<ServiceState>,
        state: ServiceState,
    ) -> anyhow::Result<TestServer> {
        let app: Router = router.with_state(state).into();
        let server = TestServer::new(app)?;
        Ok(server)
    }

    /// Returns a new [`TestServer`] with the default router and the mailer
    /// that receives its magic links.
    pub fn create_test_server() -> anyhow::Result<(TestServer, MemoryMailer)> {
        let (state, mailer) = memory_state()?;
        let router = routes(CustomRoutes::new(), state.clone());
        let server = create_test_server_with_state(router, state)?;
        Ok((server, mailer))
    }

    /// Extracts the credential from the last magic link sent.
    pub fn login_token_from(mailer: &MemoryMailer) -> String {
        let message = mailer.last_sent().expect("no magic link was sent");
        let start = message.html.find("token=").expect("no token in link") + "token=".len();
        let end = message.html[start..].find('"').expect("unterminated link") + start;
        message.html[start..end].to_owned()
    }

    /// Logs in through the magic-link flow and returns a session credential.
    pub async fn session_for(server: &TestServer, mailer: &MemoryMailer, email: &str) -> String {
        server
            .post("/auth/login")
            .json(&json!({ "email": email }))
            .await
            .assert_status_ok();

        let response = server
            .post("/auth/verify")
            .json(&json!({ "token": login_token_from(mailer) }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        body["token"].as_str().expect("no session token").to_owned()
    }

    #[tokio::test]
    async fn handlers() -> anyhow::Result<()> {
        let (server, _) = create_test_server()?;
        assert!(server.is_running());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_routes_return_json_not_found() -> anyhow::Result<()> {
        let (server, _) = create_test_server()?;

        let response = server.get("/nothing/here").await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["name"], "not_found");
        Ok(())
    }

    #[tokio::test]
    async fn authentication_routes_can_be_disabled() -> anyhow::Result<()> {
        let (state, _) = memory_state()?;
        let custom = CustomRoutes::new().with_disable_authentication(true);
        let server = create_test_server_with_state(routes(custom, state.clone()), state)?;

        let response = server
            .post("/auth/login")
            .json(&json!({ "email": "ada@example.com" }))
            .await;
        response.assert_status_not_found();

        server.get("/polls").await.assert_status_ok();
        Ok(())
    }
}

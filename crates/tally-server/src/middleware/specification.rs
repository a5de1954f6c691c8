//! OpenAPI specification middleware with Scalar UI integration.
//!
//! The specification is generated from the routes registered through
//! [`ApiRouter`] and served as JSON next to a Scalar API reference page.
//!
//! ```rust
//! use aide::axum::ApiRouter;
//! use axum::Router;
//! use tally_server::middleware::{OpenApiConfig, RouterOpenApiExt};
//!
//! let app: Router<()> = ApiRouter::new()
//!     .with_open_api(OpenApiConfig::default());
//! ```
//!
//! [`ApiRouter`]: aide::axum::ApiRouter

use aide::axum::ApiRouter;
use aide::openapi::{Info, License, OpenApi, SecurityScheme};
use aide::scalar::Scalar;
use aide::transform::TransformOpenApi;
use axum::routing::{Router, get};
use axum::{Extension, Json};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Name of the bearer security scheme referenced by private operations.
pub(crate) const BEARER_AUTH: &str = "BearerAuth";

/// Paths where the specification and its UI are served.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct OpenApiConfig {
    /// Path which exposes the OpenAPI JSON specification.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAPI_JSON_PATH", default_value = "/api/openapi.json")
    )]
    pub open_api_json: String,

    /// Path which exposes the Scalar API reference UI.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAPI_SCALAR_PATH", default_value = "/api/scalar")
    )]
    pub scalar_ui: String,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            open_api_json: "/api/openapi.json".to_owned(),
            scalar_ui: "/api/scalar".to_owned(),
        }
    }
}

/// Extension trait for [`ApiRouter`] to serve its OpenAPI specification.
///
/// [`ApiRouter`]: aide::axum::ApiRouter
pub trait RouterOpenApiExt<S> {
    /// Finishes the router and serves its specification with the default info.
    fn with_open_api(self, config: OpenApiConfig) -> Router<S>;

    /// Finishes the router and serves its specification with custom [`Info`].
    ///
    /// [`Info`]: aide::openapi::Info
    fn with_open_api_info(self, config: OpenApiConfig, info: Info) -> Router<S>;
}

impl<S> RouterOpenApiExt<S> for ApiRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_open_api(self, config: OpenApiConfig) -> Router<S> {
        let info = Info {
            title: "Tally API".to_owned(),
            summary: Some("Real-time polls with magic-link sign-in".to_owned()),
            description: Some(
                "Create polls, vote anonymously and follow the tallies live over \
                 Server-Sent Events or WebSocket. Creating and deleting polls requires \
                 a session credential obtained through an emailed magic link."
                    .to_owned(),
            ),
            license: Some(License {
                name: "MIT".to_owned(),
                identifier: Some("MIT".to_owned()),
                ..License::default()
            }),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            ..Info::default()
        };

        self.with_open_api_info(config, info)
    }

    fn with_open_api_info(self, config: OpenApiConfig, info: Info) -> Router<S> {
        async fn serve_openapi(Extension(api): Extension<OpenApi>) -> Json<OpenApi> {
            Json(api)
        }

        let mut api = OpenApi {
            info,
            ..OpenApi::default()
        };

        let scalar = Scalar::new(&config.open_api_json);
        let router = self
            .route(&config.scalar_ui, scalar.axum_route())
            .route(&config.open_api_json, get(serve_openapi));

        router
            .finish_api_with(&mut api, add_security_schemes)
            .layer(Extension(api))
    }
}

fn add_security_schemes(api: TransformOpenApi<'_>) -> TransformOpenApi<'_> {
    api.security_scheme(
        BEARER_AUTH,
        SecurityScheme::Http {
            scheme: "bearer".to_owned(),
            bearer_format: Some("JWT".to_owned()),
            description: Some("Session credential returned by `POST /auth/verify`.".to_owned()),
            extensions: Default::default(),
        },
    )
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use serde_json::Value;

    use super::*;
    use crate::handler::{CustomRoutes, routes};
    use crate::service::test::memory_state;

    #[tokio::test]
    async fn serves_specification_with_bearer_scheme() -> anyhow::Result<()> {
        let (state, _) = memory_state()?;
        let app = routes(CustomRoutes::new(), state.clone())
            .with_open_api(OpenApiConfig::default())
            .with_state(state);
        let server = TestServer::new(app)?;

        let response = server.get("/api/openapi.json").await;
        response.assert_status_ok();
        let spec: Value = response.json();

        assert_eq!(spec["info"]["title"], "Tally API");
        assert_eq!(
            spec["components"]["securitySchemes"][BEARER_AUTH]["scheme"],
            "bearer"
        );
        assert!(spec["paths"]["/polls/{pollId}/vote"]["post"].is_object());
        assert!(spec["paths"]["/auth/login"]["post"].is_object());

        server.get("/api/scalar").await.assert_status_ok();
        Ok(())
    }
}

//! Middleware for `axum::Router` and HTTP request processing.
//!
//! Each concern is exposed as an extension trait on `axum::`[`Router`]:
//! authentication, recovery from errors and panics, request observability,
//! security (CORS, headers, body limits) and the OpenAPI specification.
//!
//! ```rust,no_run
//! use axum::Router;
//! use tally_server::middleware::{
//!     RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app: Router = Router::new()
//!     .with_default_security()
//!     .with_observability()
//!     .with_default_recovery();
//! ```
//!
//! [`Router`]: axum::Router

mod authentication;
mod observability;
mod recovery;
mod security;
mod specification;

pub use authentication::{RouterAuthExt, require_authentication};
pub use observability::{RouterObservabilityExt, track_categorized_metrics};
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{CorsConfig, RouterSecurityExt, SecurityHeadersConfig};
pub use specification::{OpenApiConfig, RouterOpenApiExt};

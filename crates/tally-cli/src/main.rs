#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use tally_server::handler::{CustomRoutes, routes};
use tally_server::middleware::{
    RouterObservabilityExt, RouterOpenApiExt, RouterRecoveryExt, RouterSecurityExt,
    SecurityHeadersConfig,
};
use tally_server::service::{ServiceConfig, ServiceState};
use tokio_util::sync::CancellationToken;

use crate::config::{Cli, MiddlewareConfig};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "tally_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "tally_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "tally_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "Application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = format!("{error:#}"),
            "Application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "Starting tally server"
    );

    let shutdown = CancellationToken::new();
    let state = create_service_state(&cli.service, shutdown.clone()).await?;
    let router = create_router(state, &cli.middleware, &cli.service);

    let result = server::serve_http(router, cli.server, shutdown.clone()).await;
    shutdown.cancel();

    result.context("server stopped with an error")
}

async fn create_service_state(
    config: &ServiceConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<ServiceState> {
    ServiceState::from_config(config, shutdown)
        .await
        .context("failed to create service state")
}

/// Creates the router with all middleware layers applied.
///
/// Layers wrap in reverse order (last added = outermost):
/// 1. Recovery (outermost): catches panics and enforces timeouts
/// 2. Observability: request ids and tracing spans
/// 3. Security: CORS, security headers, compression, body limits
/// 4. Routes and the OpenAPI document (innermost)
fn create_router(
    state: ServiceState,
    middleware: &MiddlewareConfig,
    service: &ServiceConfig,
) -> Router {
    let cors = middleware.cors.clone().with_origin(&service.frontend_url);

    routes(CustomRoutes::new(), state.clone())
        .with_open_api(middleware.openapi.clone())
        .with_state(state)
        .with_security(&cors, &SecurityHeadersConfig::default())
        .with_observability()
        .with_recovery(&middleware.recovery)
}

//! HTTP server startup.

use std::future::IntoFuture;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::ServerConfig;
use crate::server::lifecycle::serve_with_shutdown;
use crate::server::{Result, ServerError, shutdown_signal};

/// Binds the configured address and serves `app` until a shutdown signal.
///
/// `shutdown` is cancelled when the signal arrives so other background
/// work can stop alongside the server.
pub async fn serve_http(
    app: Router,
    server_config: ServerConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let server_addr = server_config.server_addr();

    let listener = TcpListener::bind(server_addr).await.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            error = %err,
            "Failed to bind to address"
        );
        ServerError::bind(server_addr, err)
    })?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_addr,
        "Server is ready and listening for connections"
    );

    let graceful = shutdown.clone().cancelled_owned();
    let server = axum::serve(listener, app).with_graceful_shutdown(graceful);

    serve_with_shutdown(
        &server_config,
        shutdown,
        shutdown_signal(),
        server.into_future(),
    )
    .await
}

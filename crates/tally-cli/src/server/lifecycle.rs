//! Server lifecycle: run until a signal, then drain within a deadline.

use std::future::Future;
use std::io;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::server::{Result, ServerError};
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Drives `serve` until it finishes or `signal` fires.
///
/// On a signal `shutdown` is cancelled, which starts the graceful shutdown of
/// the server, and `serve` gets the configured shutdown timeout to finish.
/// Connections still open after that (event streams, sockets) are dropped.
pub async fn serve_with_shutdown<F, S>(
    server_config: &ServerConfig,
    shutdown: CancellationToken,
    signal: S,
    serve: F,
) -> Result<()>
where
    F: Future<Output = io::Result<()>>,
    S: Future<Output = ()>,
{
    let start_time = Instant::now();

    if server_config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server bound to all interfaces, ensure firewall is configured"
        );
    }

    tokio::pin!(serve);

    let result = tokio::select! {
        result = &mut serve => result,
        () = signal => {
            shutdown.cancel();

            let timeout = server_config.shutdown_timeout();
            match tokio::time::timeout(timeout, &mut serve).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: TRACING_TARGET_SERVER_SHUTDOWN,
                        timeout_secs = timeout.as_secs(),
                        "Shutdown timeout elapsed, dropping open connections"
                    );
                    Ok(())
                }
            }
        }
    };

    handle_result(result.map_err(ServerError::Runtime), start_time)
}

fn handle_result(result: Result<()>, start_time: Instant) -> Result<()> {
    let uptime = start_time.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = uptime.as_secs(),
                "Shutdown completed"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                kind = ?err.io_kind(),
                uptime_secs = uptime.as_secs(),
                "Fatal error"
            );

            if let Some(suggestion) = err.suggestion() {
                tracing::info!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    suggestion = suggestion,
                    "Recovery suggestion"
                );
            }

            Err(err)
        }
    }
}

//! Service health handler.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::http::StatusCode;

use super::response::MonitorStatus;
use crate::extract::Json;
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "tally_server::handler::monitors";

/// Reports that the server is up.
#[tracing::instrument(skip_all)]
async fn health_status() -> Result<(StatusCode, Json<MonitorStatus>)> {
    let response = MonitorStatus::default();

    tracing::debug!(
        target: TRACING_TARGET,
        status = %response.status,
        version = %response.version,
        "Health status checked"
    );

    Ok((StatusCode::OK, Json(response)))
}

fn health_status_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get service health")
        .description("Returns a greeting, the service status and the running version.")
        .response::<200, Json<MonitorStatus>>()
}

/// Returns a [`Router`] with all health monitoring routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/health", get_with(health_status, health_status_docs))
        .with_path_items(|item| item.tag("Health"))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::handler::test::create_test_server_with_router;

    #[tokio::test]
    async fn health_is_public() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes())?;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["message"], "Hello from the backend server!");
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["checkedAt"].is_string());
        Ok(())
    }
}

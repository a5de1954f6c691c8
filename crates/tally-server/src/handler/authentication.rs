//! Magic-link authentication handlers.
//!
//! Logging in is a two step exchange. `POST /auth/login` emails a single-use
//! link to the given address, creating the user on first contact, and
//! `POST /auth/verify` redeems the credential from that link for a session
//! credential. Every verification failure produces the same response.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;

use super::request::{Login, VerifyLogin};
use super::response::{AuthToken, CurrentUser, LoginRequested, User};
use crate::extract::{AuthState, Json, ValidateJson};
use crate::handler::Result;
use crate::handler::response::ErrorResponse;
use crate::service::{MagicLinkAuthenticator, ServiceState};

/// Tracing target for authentication operations.
const TRACING_TARGET: &str = "tally_server::handler::authentication";

/// Emails a magic link to the given address.
#[tracing::instrument(skip_all)]
async fn login(
    State(magic_link): State<MagicLinkAuthenticator>,
    ValidateJson(request): ValidateJson<Login>,
) -> Result<(StatusCode, Json<LoginRequested>)> {
    tracing::trace!(target: TRACING_TARGET, "Login requested");

    magic_link.request_login(&request.email).await?;

    Ok((StatusCode::OK, Json(LoginRequested::default())))
}

fn login_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Request a magic link")
        .description(
            "Sends a single-use login link to the given email address. The user is created \
             on first contact. The response is the same for new and existing addresses.",
        )
        .response::<200, Json<LoginRequested>>()
        .response::<400, Json<ErrorResponse<'static>>>()
        .response::<500, Json<ErrorResponse<'static>>>()
}

/// Redeems a magic-link credential for a session credential.
#[tracing::instrument(skip_all)]
async fn verify(
    State(magic_link): State<MagicLinkAuthenticator>,
    ValidateJson(request): ValidateJson<VerifyLogin>,
) -> Result<(StatusCode, Json<AuthToken>)> {
    tracing::trace!(target: TRACING_TARGET, "Magic link verification requested");

    let verified = magic_link.verify_login(&request.token).await?;

    tracing::info!(
        target: TRACING_TARGET,
        user_id = %verified.user.id,
        expires_at = %verified.session.claims.expires_at,
        "Session issued"
    );

    let response = AuthToken {
        token: verified.session.token,
        user: User::from_model(verified.user),
    };

    Ok((StatusCode::OK, Json(response)))
}

fn verify_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Redeem a magic link")
        .description(
            "Exchanges the credential carried by a magic link for a seven-day session \
             credential. Each link can be redeemed once and expires after one hour.",
        )
        .response::<200, Json<AuthToken>>()
        .response::<400, Json<ErrorResponse<'static>>>()
        .response::<401, Json<ErrorResponse<'static>>>()
}

/// Returns the user behind the presented session credential.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
async fn current_user(
    AuthState(user): AuthState,
) -> Result<(StatusCode, Json<CurrentUser>)> {
    let response = CurrentUser {
        user: User::from_model(user),
    };

    Ok((StatusCode::OK, Json(response)))
}

fn current_user_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get the current user")
        .description("Returns the user identified by the bearer session credential.")
        .security_requirement("BearerAuth")
        .response::<200, Json<CurrentUser>>()
        .response::<401, Json<ErrorResponse<'static>>>()
}

/// Returns routes that do not require authentication.
pub fn public_routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/auth/login", post_with(login, login_docs))
        .api_route("/auth/verify", post_with(verify, verify_docs))
        .with_path_items(|item| item.tag("Authentication"))
}

/// Returns routes that require a session credential.
pub fn private_routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/auth/me", get_with(current_user, current_user_docs))
        .with_path_items(|item| item.tag("Authentication"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handler::test::{create_test_server, login_token_from};

    #[tokio::test]
    async fn login_and_verify_flow() -> anyhow::Result<()> {
        let (server, mailer) = create_test_server()?;

        let response = server
            .post("/auth/login")
            .json(&json!({ "email": " Ada@Example.com " }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "message": "Check your email for the magic link!" }));

        let token = login_token_from(&mailer);
        let response = server
            .post("/auth/verify")
            .json(&json!({ "token": token }))
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["user"]["email"], "ada@example.com");
        let session = body["token"].as_str().unwrap_or_default().to_owned();
        assert!(!session.is_empty());

        let response = server
            .get("/auth/me")
            .authorization_bearer(&session)
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["user"]["email"], "ada@example.com");

        // Links are single use.
        let response = server
            .post("/auth/verify")
            .json(&json!({ "token": token }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn login_response_does_not_reveal_known_addresses() -> anyhow::Result<()> {
        let (server, mailer) = create_test_server()?;

        server
            .post("/auth/login")
            .json(&json!({ "email": "ada@example.com" }))
            .await
            .assert_status_ok();

        let known = server
            .post("/auth/login")
            .json(&json!({ "email": "ada@example.com" }))
            .await;
        let fresh = server
            .post("/auth/login")
            .json(&json!({ "email": "grace@example.com" }))
            .await;

        assert_eq!(known.status_code(), fresh.status_code());
        assert_eq!(known.text(), fresh.text());
        assert_eq!(mailer.sent().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn login_rejects_invalid_email() -> anyhow::Result<()> {
        let (server, mailer) = create_test_server()?;

        let response = server.post("/auth/login").json(&json!({})).await;
        response.assert_status_bad_request();

        let response = server
            .post("/auth/login")
            .json(&json!({ "email": "not-an-email" }))
            .await;
        response.assert_status_bad_request();
        assert!(mailer.sent().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn login_reports_delivery_failure() -> anyhow::Result<()> {
        let (server, mailer) = create_test_server()?;
        mailer.fail_send(true);

        let response = server
            .post("/auth/login")
            .json(&json!({ "email": "ada@example.com" }))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Failed to send magic link.");
        Ok(())
    }

    #[tokio::test]
    async fn verify_failures_share_one_body() -> anyhow::Result<()> {
        let (server, _) = create_test_server()?;

        let garbage = server
            .post("/auth/verify")
            .json(&json!({ "token": "garbage" }))
            .await;
        garbage.assert_status(StatusCode::UNAUTHORIZED);

        let empty = server.post("/auth/verify").json(&json!({})).await;
        empty.assert_status(StatusCode::UNAUTHORIZED);

        assert_eq!(garbage.text(), empty.text());
        Ok(())
    }

    #[tokio::test]
    async fn me_requires_token() -> anyhow::Result<()> {
        let (server, _) = create_test_server()?;

        let response = server.get("/auth/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Access denied. No token provided.");

        let response = server
            .get("/auth/me")
            .authorization_bearer("not-a-token")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }
}

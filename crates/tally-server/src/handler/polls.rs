//! Poll handlers.
//!
//! Listing and voting are public. Creating and deleting polls requires a
//! session credential, and only the creator of a poll may delete it.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;

use super::request::{CreatePoll, PollPathParams, Vote};
use super::response::{Poll, PollDeleted, Polls};
use crate::extract::{AuthState, Json, Path, ValidateJson};
use crate::handler::Result;
use crate::handler::response::ErrorResponse;
use crate::service::{PollEngine, ServiceState};

/// Tracing target for poll operations.
const TRACING_TARGET: &str = "tally_server::handler::polls";

/// Creates a poll owned by the authenticated user.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
async fn create_poll(
    State(poll_engine): State<PollEngine>,
    AuthState(user): AuthState,
    ValidateJson(request): ValidateJson<CreatePoll>,
) -> Result<(StatusCode, Json<Poll>)> {
    tracing::trace!(
        target: TRACING_TARGET,
        option_count = request.options.len(),
        "Creating poll"
    );

    let poll = poll_engine
        .create_poll(user.id, &request.question, &request.options)
        .await?;

    Ok((StatusCode::CREATED, Json(Poll::from_model(poll))))
}

fn create_poll_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Create a poll")
        .description(
            "Creates a poll with a question and at least two options. Options are trimmed \
             and blank ones are dropped. Every vote counter starts at zero.",
        )
        .security_requirement("BearerAuth")
        .response::<201, Json<Poll>>()
        .response::<400, Json<ErrorResponse<'static>>>()
        .response::<401, Json<ErrorResponse<'static>>>()
}

/// Lists every poll, newest first.
#[tracing::instrument(skip_all)]
async fn list_polls(
    State(poll_engine): State<PollEngine>,
) -> Result<(StatusCode, Json<Polls>)> {
    let polls = poll_engine.list_polls().await?;
    let response: Polls = polls.into_iter().map(Poll::from_model).collect();

    Ok((StatusCode::OK, Json(response)))
}

fn list_polls_docs(op: TransformOperation) -> TransformOperation {
    op.summary("List polls")
        .description(
            "Returns every poll with its current tallies, newest first. Clients that \
             reconnect to the event stream should call this to catch up.",
        )
        .response::<200, Json<Polls>>()
}

/// Casts one anonymous vote.
#[tracing::instrument(skip_all, fields(poll_id = %path_params.poll_id))]
async fn vote(
    State(poll_engine): State<PollEngine>,
    Path(path_params): Path<PollPathParams>,
    Json(request): Json<Vote>,
) -> Result<(StatusCode, Json<Poll>)> {
    let poll = poll_engine
        .vote(path_params.poll_id(), request.option_index)
        .await?;

    Ok((StatusCode::OK, Json(Poll::from_model(poll))))
}

fn vote_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Vote on a poll")
        .description(
            "Adds one vote to the option at `optionIndex` and broadcasts the updated poll \
             as a `vote-update` event. No authentication is required.",
        )
        .response::<200, Json<Poll>>()
        .response::<400, Json<ErrorResponse<'static>>>()
        .response::<404, Json<ErrorResponse<'static>>>()
}

/// Deletes a poll created by the authenticated user.
#[tracing::instrument(skip_all, fields(user_id = %user.id, poll_id = %path_params.poll_id))]
async fn delete_poll(
    State(poll_engine): State<PollEngine>,
    AuthState(user): AuthState,
    Path(path_params): Path<PollPathParams>,
) -> Result<(StatusCode, Json<PollDeleted>)> {
    poll_engine
        .delete_poll(user.id, path_params.poll_id())
        .await?;

    Ok((StatusCode::OK, Json(PollDeleted::default())))
}

fn delete_poll_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Delete a poll")
        .description(
            "Deletes a poll and broadcasts a `poll-deleted` event. Only the creator of \
             the poll may delete it.",
        )
        .security_requirement("BearerAuth")
        .response::<200, Json<PollDeleted>>()
        .response::<401, Json<ErrorResponse<'static>>>()
        .response::<403, Json<ErrorResponse<'static>>>()
        .response::<404, Json<ErrorResponse<'static>>>()
}

/// Returns routes that do not require authentication.
pub fn public_routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/polls", get_with(list_polls, list_polls_docs))
        .api_route("/polls/{pollId}/vote", post_with(vote, vote_docs))
        .with_path_items(|item| item.tag("Polls"))
}

/// Returns routes that require a session credential.
pub fn private_routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/polls", post_with(create_poll, create_poll_docs))
        .api_route("/polls/{pollId}", delete_with(delete_poll, delete_poll_docs))
        .with_path_items(|item| item.tag("Polls"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::handler::test::{create_test_server, session_for};

    async fn create(server: &TestServer, session: &str, body: Value) -> Value {
        let response = server
            .post("/polls")
            .authorization_bearer(session)
            .json(&body)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    #[tokio::test]
    async fn create_list_and_vote() -> anyhow::Result<()> {
        let (server, mailer) = create_test_server()?;
        let session = session_for(&server, &mailer, "ada@example.com").await;

        let poll = create(
            &server,
            &session,
            json!({ "question": "Best color?", "options": ["Red", "Blue"] }),
        )
        .await;
        assert_eq!(poll["question"], "Best color?");
        assert_eq!(poll["options"], json!([
            { "text": "Red", "votes": 0 },
            { "text": "Blue", "votes": 0 },
        ]));
        let poll_id = poll["id"].as_str().unwrap_or_default().to_owned();

        let response = server
            .post(&format!("/polls/{poll_id}/vote"))
            .json(&json!({ "optionIndex": 0 }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["options"][0]["votes"], 1);

        let response = server
            .post(&format!("/polls/{poll_id}/vote"))
            .json(&json!({ "optionIndex": 1 }))
            .await;
        let body: Value = response.json();
        assert_eq!(body["options"][1]["votes"], 1);

        let response = server.get("/polls").await;
        response.assert_status_ok();
        let polls: Value = response.json();
        assert_eq!(polls.as_array().map(Vec::len), Some(1));
        assert_eq!(polls[0]["id"], poll_id);
        Ok(())
    }

    #[tokio::test]
    async fn create_requires_authentication() -> anyhow::Result<()> {
        let (server, _) = create_test_server()?;

        let response = server
            .post("/polls")
            .json(&json!({ "question": "Q?", "options": ["A", "B"] }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn create_validates_input() -> anyhow::Result<()> {
        let (server, mailer) = create_test_server()?;
        let session = session_for(&server, &mailer, "ada@example.com").await;

        let response = server
            .post("/polls")
            .authorization_bearer(&session)
            .json(&json!({ "question": "Q?", "options": ["A", "  "] }))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["message"], "Question and at least two options are required.");

        let response = server
            .post("/polls")
            .authorization_bearer(&session)
            .json(&json!({}))
            .await;
        response.assert_status_bad_request();
        Ok(())
    }

    #[tokio::test]
    async fn vote_errors() -> anyhow::Result<()> {
        let (server, mailer) = create_test_server()?;
        let session = session_for(&server, &mailer, "ada@example.com").await;
        let poll = create(
            &server,
            &session,
            json!({ "question": "Q?", "options": ["A", "B"] }),
        )
        .await;
        let poll_id = poll["id"].as_str().unwrap_or_default().to_owned();

        let response = server
            .post(&format!("/polls/{poll_id}/vote"))
            .json(&json!({ "optionIndex": 5 }))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["message"], "Invalid option index.");

        let response = server
            .post(&format!("/polls/{poll_id}/vote"))
            .json(&json!({}))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["message"], "optionIndex is required.");

        let response = server
            .post("/polls/0191e6a2-7c1d-7000-8000-000000000000/vote")
            .json(&json!({ "optionIndex": 0 }))
            .await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["message"], "Poll not found.");

        let response = server
            .post("/polls/not-a-uuid/vote")
            .json(&json!({ "optionIndex": 0 }))
            .await;
        response.assert_status_not_found();
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_owner_only() -> anyhow::Result<()> {
        let (server, mailer) = create_test_server()?;
        let owner = session_for(&server, &mailer, "owner@example.com").await;
        let other = session_for(&server, &mailer, "other@example.com").await;

        let poll = create(
            &server,
            &owner,
            json!({ "question": "Q?", "options": ["A", "B"] }),
        )
        .await;
        let path = format!("/polls/{}", poll["id"].as_str().unwrap_or_default());

        let response = server.delete(&path).await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server.delete(&path).authorization_bearer(&other).await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["message"], "You can only delete your own polls.");

        let response = server.delete(&path).authorization_bearer(&owner).await;
        response.assert_status_ok();
        response.assert_json(&json!({ "message": "Poll deleted successfully!" }));

        let response = server.delete(&path).authorization_bearer(&owner).await;
        response.assert_status_not_found();
        Ok(())
    }
}

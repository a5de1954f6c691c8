//! Live poll updates over Server-Sent Events and WebSocket.
//!
//! Both transports carry the same [`PollEvent`]s and neither requires
//! authentication. Delivery is best effort: a client that disconnects or
//! falls behind misses events and should re-fetch `GET /polls`.

use std::convert::Infallible;
use std::ops::ControlFlow;
use std::time::Instant;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{SinkExt, Stream, StreamExt};
use uuid::Uuid;

use crate::handler::Result;
use crate::service::{EventBroadcaster, PollEvent, ServiceState};

/// Tracing target for event stream operations.
const TRACING_TARGET: &str = "tally_server::handler::events";

/// Converts a poll event into an SSE frame named after the event kind.
fn sse_event(event: &PollEvent) -> Option<Event> {
    match event.data_json() {
        Ok(data) => Some(Event::default().event(event.name()).data(data)),
        Err(e) => {
            tracing::error!(
                target: TRACING_TARGET,
                event = event.name(),
                error = %e,
                "Failed to serialize event"
            );
            None
        }
    }
}

/// Streams poll events as Server-Sent Events.
#[tracing::instrument(skip_all)]
async fn event_stream(
    State(broadcaster): State<EventBroadcaster>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(
        target: TRACING_TARGET,
        subscribers = broadcaster.subscriber_count() + 1,
        "Event stream opened"
    );

    let stream = broadcaster
        .stream()
        .filter_map(|event| async move { sse_event(&event).map(Ok) });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handles one message received from a WebSocket client.
///
/// Clients only listen; anything other than a close frame is ignored.
fn process_client_message(connection_id: Uuid, message: Message) -> ControlFlow<()> {
    match message {
        Message::Close(close_frame) => {
            tracing::debug!(
                target: TRACING_TARGET,
                connection_id = %connection_id,
                close_code = close_frame.as_ref().map(|cf| cf.code),
                "Client sent close frame"
            );
            ControlFlow::Break(())
        }
        Message::Text(_) | Message::Binary(_) => {
            tracing::trace!(
                target: TRACING_TARGET,
                connection_id = %connection_id,
                "Ignoring client message"
            );
            ControlFlow::Continue(())
        }
        Message::Ping(_) | Message::Pong(_) => ControlFlow::Continue(()),
    }
}

/// Forwards events to a WebSocket client until either side stops.
async fn handle_event_socket(
    socket: WebSocket,
    events: impl Stream<Item = PollEvent> + Send + 'static,
) {
    let connection_id = Uuid::new_v4();
    let started_at = Instant::now();

    tracing::info!(
        target: TRACING_TARGET,
        connection_id = %connection_id,
        "WebSocket connection established"
    );

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        let mut events = std::pin::pin!(events);
        let mut sent: u64 = 0;

        while let Some(event) = events.next().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        connection_id = %connection_id,
                        error = %e,
                        "Failed to serialize event"
                    );
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(Utf8Bytes::from(text))).await {
                tracing::debug!(
                    target: TRACING_TARGET,
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to send event, client disconnected"
                );
                break;
            }
            sent += 1;
        }

        sent
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if process_client_message(connection_id, message).is_break() {
                break;
            }
        }
    });

    let sent = tokio::select! {
        sent = &mut send_task => {
            recv_task.abort();
            sent.unwrap_or_default()
        },
        _ = &mut recv_task => {
            send_task.abort();
            0
        },
    };

    tracing::info!(
        target: TRACING_TARGET,
        connection_id = %connection_id,
        duration_ms = started_at.elapsed().as_millis(),
        events_sent = sent,
        "WebSocket connection closed"
    );
}

/// Upgrades the connection to a WebSocket that streams poll events.
#[tracing::instrument(skip_all)]
async fn event_socket(
    State(broadcaster): State<EventBroadcaster>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    // Subscribe before the upgrade so no event between the two is missed.
    let events = broadcaster.stream();
    Ok(ws.on_upgrade(move |socket| handle_event_socket(socket, events)))
}

fn event_socket_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Stream poll events over WebSocket")
        .description(
            "Sends one JSON text frame per event: `{\"event\":\"vote-update\",\"data\":<poll>}` \
             or `{\"event\":\"poll-deleted\",\"data\":\"<pollId>\"}`. Messages sent by the \
             client are ignored.",
        )
        .response::<101, ()>()
}

/// Returns a [`Router`] with the event stream routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .route("/events", axum::routing::get(event_stream))
        .api_route("/events/ws", get_with(event_socket, event_socket_docs))
        .with_path_items(|item| item.tag("Events"))
}

#[cfg(test)]
mod tests {
    use axum::http::header;
    use axum::response::IntoResponse;
    use axum_test::TestServer;
    use serde_json::Value;
    use tally_store::model::PollId;

    use super::*;
    use crate::service::test::memory_state;

    #[tokio::test]
    async fn sse_frames_carry_event_name_and_data() -> anyhow::Result<()> {
        let broadcaster = EventBroadcaster::new(8);
        let response = event_stream(State(broadcaster.clone())).await.into_response();

        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        assert_eq!(
            content_type.as_ref().and_then(|v| v.to_str().ok()),
            Some("text/event-stream")
        );

        let poll_id = PollId::new();
        broadcaster.publish(PollEvent::PollDeleted(poll_id));

        let mut body = response.into_body().into_data_stream();
        let chunk = body.next().await.transpose()?.unwrap_or_default();
        let frame = String::from_utf8(chunk.to_vec())?;

        assert!(frame.contains("event: poll-deleted"));
        assert!(frame.contains(&format!("data: \"{poll_id}\"")));
        Ok(())
    }

    #[tokio::test]
    async fn websocket_receives_events() -> anyhow::Result<()> {
        let (state, _) = memory_state()?;
        let broadcaster = state.broadcaster.clone();

        let app: axum::Router = routes().with_state(state).into();
        let server = TestServer::builder().http_transport().build(app)?;

        let mut socket = server.get_websocket("/events/ws").await.into_websocket().await;

        let poll_id = PollId::new();
        broadcaster.publish(PollEvent::PollDeleted(poll_id));

        let message: Value = socket.receive_json().await;
        assert_eq!(message["event"], "poll-deleted");
        assert_eq!(message["data"], poll_id.to_string());
        Ok(())
    }
}

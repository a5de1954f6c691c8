//! In-process fan-out of poll events to connected viewers.
//!
//! Delivery is best effort and at most once: events published while nobody
//! listens are dropped, and a subscriber that falls more than the channel
//! capacity behind skips the events it missed. A reconnecting client is
//! expected to re-fetch the poll list.

use futures::{Stream, StreamExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_store::model::{Poll, PollId};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::TRACING_TARGET_BROADCAST as TRACING_TARGET;

/// Default number of events buffered per subscriber.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// An event pushed to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum PollEvent {
    /// A vote was recorded; carries the full updated poll.
    VoteUpdate(Poll),
    /// A poll was deleted; carries its identifier.
    PollDeleted(PollId),
}

impl PollEvent {
    /// Returns the event name used on the wire.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::VoteUpdate(_) => "vote-update",
            Self::PollDeleted(_) => "poll-deleted",
        }
    }

    /// Serializes only the payload of the event.
    pub fn data_json(&self) -> serde_json::Result<String> {
        match self {
            Self::VoteUpdate(poll) => serde_json::to_string(poll),
            Self::PollDeleted(poll_id) => serde_json::to_string(poll_id),
        }
    }

    /// Serializes the whole event envelope.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Publishes [`PollEvent`]s to all current subscribers.
///
/// Cheaply cloneable; clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<PollEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster buffering up to `capacity` events per subscriber.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers will receive it.
    ///
    /// Never blocks and never fails; with no subscribers the event is dropped.
    pub fn publish(&self, event: PollEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    event = name,
                    receivers,
                    "Event published"
                );
                receivers
            }
            Err(_) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    event = name,
                    "Event dropped, no subscribers"
                );
                0
            }
        }
    }

    /// Returns a raw receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.sender.subscribe()
    }

    /// Returns a stream of events published from now on.
    ///
    /// Events missed by a lagging subscriber are skipped.
    pub fn stream(&self) -> impl Stream<Item = PollEvent> + Send + 'static + use<> {
        BroadcastStream::new(self.subscribe()).filter_map(|result| async move {
            match result {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        skipped,
                        "Subscriber lagged, events skipped"
                    );
                    None
                }
            }
        })
    }

    /// Returns the number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

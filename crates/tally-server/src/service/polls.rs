//! Poll creation, voting and deletion.
//!
//! Every successful mutation is followed by a broadcast so connected viewers
//! see the new tallies without polling. The vote counter itself is only ever
//! changed through the store's atomic increment.

use tally_store::model::{NewPoll, Poll, PollId, UserId};
use tally_store::StoreClient;

use super::{EventBroadcaster, PollEvent};
use crate::TRACING_TARGET_POLLS as TRACING_TARGET;
use crate::handler::{Error, ErrorKind, Result};

/// Minimum number of non-blank options a poll needs.
pub const MIN_POLL_OPTIONS: usize = 2;

/// Application logic for polls.
#[derive(Debug, Clone)]
pub struct PollEngine {
    store: StoreClient,
    broadcaster: EventBroadcaster,
}

impl PollEngine {
    /// Creates an engine that persists to `store` and announces through `broadcaster`.
    pub fn new(store: StoreClient, broadcaster: EventBroadcaster) -> Self {
        Self { store, broadcaster }
    }

    /// Creates a poll owned by `creator`.
    ///
    /// The question and every option are trimmed; blank options are dropped
    /// and the remaining ones keep their order.
    pub async fn create_poll(
        &self,
        creator: UserId,
        question: &str,
        options: &[String],
    ) -> Result<Poll> {
        let question = question.trim();
        let options: Vec<String> = options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(str::to_owned)
            .collect();

        if question.is_empty() || options.len() < MIN_POLL_OPTIONS {
            tracing::debug!(
                target: TRACING_TARGET,
                user_id = %creator,
                has_question = !question.is_empty(),
                option_count = options.len(),
                "Rejected poll without question or enough options"
            );

            return Err(ErrorKind::BadRequest
                .with_message("Question and at least two options are required.")
                .with_resource("poll"));
        }

        let poll = self
            .store
            .create_poll(NewPoll {
                question: question.to_owned(),
                options,
                created_by: creator,
            })
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            poll_id = %poll.id,
            user_id = %creator,
            option_count = poll.options.len(),
            "Poll created"
        );

        Ok(poll)
    }

    /// Lists every poll, newest first.
    pub async fn list_polls(&self) -> Result<Vec<Poll>> {
        let polls = self.store.list_polls().await?;

        tracing::debug!(
            target: TRACING_TARGET,
            count = polls.len(),
            "Polls listed"
        );

        Ok(polls)
    }

    /// Records one vote and broadcasts the updated poll.
    ///
    /// Voting is anonymous. `option_index` is the position of the option in
    /// creation order.
    pub async fn vote(&self, poll_id: PollId, option_index: Option<i64>) -> Result<Poll> {
        let Some(option_index) = option_index else {
            return Err(ErrorKind::BadRequest
                .with_message("optionIndex is required.")
                .with_resource("vote"));
        };

        let Ok(option_index) = usize::try_from(option_index) else {
            // Unknown polls take precedence over bad indices.
            if self.store.find_poll_by_id(poll_id).await?.is_none() {
                return Err(poll_not_found(poll_id));
            }
            return Err(invalid_option(option_index));
        };

        let poll = self
            .store
            .increment_vote(poll_id, option_index)
            .await?
            .ok_or_else(|| poll_not_found(poll_id))?;

        tracing::info!(
            target: TRACING_TARGET,
            poll_id = %poll.id,
            option_index,
            total_votes = poll.total_votes(),
            "Vote recorded"
        );

        self.broadcaster.publish(PollEvent::VoteUpdate(poll.clone()));
        Ok(poll)
    }

    /// Deletes a poll on behalf of its creator and broadcasts the deletion.
    pub async fn delete_poll(&self, requester: UserId, poll_id: PollId) -> Result<()> {
        let poll = self
            .store
            .find_poll_by_id(poll_id)
            .await?
            .ok_or_else(|| poll_not_found(poll_id))?;

        if !poll.is_created_by(requester) {
            tracing::warn!(
                target: TRACING_TARGET,
                poll_id = %poll_id,
                user_id = %requester,
                owner_id = %poll.created_by,
                "Rejected deletion of a poll owned by another user"
            );

            return Err(ErrorKind::Forbidden
                .with_message("You can only delete your own polls.")
                .with_resource("poll"));
        }

        if !self.store.delete_poll(poll_id).await? {
            return Err(poll_not_found(poll_id));
        }

        tracing::info!(
            target: TRACING_TARGET,
            poll_id = %poll_id,
            user_id = %requester,
            "Poll deleted"
        );

        self.broadcaster.publish(PollEvent::PollDeleted(poll_id));
        Ok(())
    }
}

fn poll_not_found(poll_id: PollId) -> Error<'static> {
    ErrorKind::NotFound
        .with_message("Poll not found.")
        .with_resource("poll")
        .with_context(format!("Poll ID: {}", poll_id))
}

fn invalid_option(option_index: i64) -> Error<'static> {
    ErrorKind::BadRequest
        .with_message("Invalid option index.")
        .with_resource("poll")
        .with_context(format!("Option index: {}", option_index))
}

//! Poll response types.

use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_store::model;
use uuid::Uuid;

/// A poll answer with its current vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    /// Answer text.
    pub text: String,
    /// Votes cast for this answer.
    pub votes: u64,
}

/// Represents a poll.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Unique identifier of the poll.
    pub id: Uuid,
    /// Question text.
    pub question: String,
    /// Answers in creation order. Votes address them by index.
    pub options: Vec<PollOption>,
    /// ID of the user who created the poll.
    pub created_by: Uuid,
    /// Timestamp when the poll was created.
    pub created_at: Timestamp,
}

impl Poll {
    pub fn from_model(poll: model::Poll) -> Self {
        Self {
            id: poll.id.as_uuid(),
            question: poll.question,
            options: poll
                .options
                .into_iter()
                .map(|option| PollOption {
                    text: option.text,
                    votes: option.votes,
                })
                .collect(),
            created_by: poll.created_by.as_uuid(),
            created_at: poll.created_at,
        }
    }
}

/// List of polls, newest first.
pub type Polls = Vec<Poll>;

/// Acknowledgment of a deleted poll.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollDeleted {
    /// Confirmation message.
    pub message: String,
}

impl Default for PollDeleted {
    fn default() -> Self {
        Self {
            message: "Poll deleted successfully!".to_owned(),
        }
    }
}

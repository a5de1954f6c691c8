//! Poll document and vote counting.

use jiff::Timestamp;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{PollId, UserId};
use crate::{Error, Result};

/// A single answer of a poll together with its vote counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    /// Answer text.
    pub text: String,
    /// Number of votes cast for this answer.
    pub votes: u64,
}

/// A question with an ordered list of answers.
///
/// Option order is fixed at creation; votes address options by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Unique poll identifier.
    pub id: PollId,
    /// Question text.
    pub question: String,
    /// Answers in creation order.
    pub options: Vec<PollOption>,
    /// Creator of the poll, the only user allowed to delete it.
    pub created_by: UserId,
    /// Timestamp of creation.
    pub created_at: Timestamp,
}

/// Data required to create a new poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
    pub created_by: UserId,
}

impl Poll {
    /// Builds a poll with all counters at zero.
    pub fn new(new_poll: NewPoll) -> Self {
        Self {
            id: PollId::new(),
            question: new_poll.question,
            options: new_poll
                .options
                .into_iter()
                .map(|text| PollOption { text, votes: 0 })
                .collect(),
            created_by: new_poll.created_by,
            created_at: Timestamp::now(),
        }
    }

    /// Increments the counter of the option at `index`.
    pub fn record_vote(&mut self, index: usize) -> Result<()> {
        let len = self.options.len();
        let option = self
            .options
            .get_mut(index)
            .ok_or(Error::OptionOutOfRange { index, len })?;
        option.votes = option.votes.saturating_add(1);
        Ok(())
    }

    /// Returns the sum of all vote counters.
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }

    /// Returns whether the given user created this poll.
    #[inline]
    pub fn is_created_by(&self, user_id: UserId) -> bool {
        self.created_by == user_id
    }

    /// Ordering key that sorts newer polls first.
    pub(crate) fn newest_first(a: &Poll, b: &Poll) -> std::cmp::Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

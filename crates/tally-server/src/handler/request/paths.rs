//! Path parameter types for HTTP handlers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_store::model::PollId;
use uuid::Uuid;

/// Path parameters for poll operations.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollPathParams {
    /// Unique identifier of the poll.
    pub poll_id: Uuid,
}

impl PollPathParams {
    /// Returns the typed poll identifier.
    #[inline]
    pub fn poll_id(&self) -> PollId {
        PollId::from(self.poll_id)
    }
}

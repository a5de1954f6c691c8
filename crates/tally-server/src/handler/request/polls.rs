//! Poll request types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for creating a poll.
///
/// Missing fields are treated as empty so that the poll rules report them.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoll {
    /// Question text.
    #[serde(default)]
    #[validate(length(max = 500))]
    pub question: String,

    /// Answer texts in display order. Blank entries are dropped.
    #[serde(default)]
    #[validate(length(max = 20))]
    pub options: Vec<String>,
}

/// Request payload for casting a vote.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Zero-based position of the chosen option.
    #[serde(default)]
    pub option_index: Option<i64>,
}

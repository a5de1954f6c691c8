//! User response types.

use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_store::model;
use uuid::Uuid;

/// Represents a registered user.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier of the user.
    pub id: Uuid,
    /// Normalized email address.
    pub email: String,
    /// Timestamp of the first login request.
    pub created_at: Timestamp,
}

impl User {
    pub fn from_model(user: model::User) -> Self {
        Self {
            id: user.id.as_uuid(),
            email: user.email,
            created_at: user.created_at,
        }
    }
}

//! Registered user document.

use jiff::Timestamp;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::UserId;

/// A person identified by a normalized email address.
///
/// Users are created on their first login request and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Normalized (trimmed, lowercased) email address.
    pub email: String,
    /// Timestamp of the first login request.
    pub created_at: Timestamp,
}

impl User {
    /// Creates a new user for an already normalized email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            created_at: Timestamp::now(),
        }
    }
}

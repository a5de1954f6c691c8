//! Authentication response types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::User;

/// Acknowledgment of a login request.
///
/// Identical for known and unknown email addresses.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequested {
    /// Instruction shown to the user.
    pub message: String,
}

impl Default for LoginRequested {
    fn default() -> Self {
        Self {
            message: "Check your email for the magic link!".to_owned(),
        }
    }
}

/// Response returned after a magic link was redeemed.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    /// Session credential to send as `Authorization: Bearer <token>`.
    pub token: String,
    /// The authenticated user.
    pub user: User,
}

/// The user behind the presented session credential.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// The authenticated user.
    pub user: User,
}

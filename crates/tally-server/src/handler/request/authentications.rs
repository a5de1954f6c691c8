//! Authentication request types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for a magic-link login.
///
/// The address is trimmed and lowercased before use.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    /// Email address the magic link is sent to.
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: String,
}

/// Request payload for redeeming a magic link.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLogin {
    /// The credential carried by the magic link.
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub token: String,
}

//! Key-value key types and traits.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::Error;
use crate::model::{LoginTokenId, PollId, UserId};

/// Marker trait for KV key types.
///
/// This trait defines how keys are formatted for storage in NATS KV.
pub trait KvKey: fmt::Debug + fmt::Display + FromStr + Clone + Send + Sync + 'static {}

impl KvKey for UserId {}

impl KvKey for PollId {}

/// Key of the unique email index.
///
/// NATS keys are restricted to a small alphabet, so the normalized email is
/// stored as its hex-encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailKey(String);

impl EmailKey {
    /// Derives the index key of a normalized email.
    pub fn from_email(email: &str) -> Self {
        Self(hex::encode(Sha256::digest(email.as_bytes())))
    }
}

impl KvKey for EmailKey {}

impl fmt::Display for EmailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EmailKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::operation("parse_email_key", format!("not a digest: {s}")));
        }
        Ok(Self(s.to_owned()))
    }
}

/// Key of a login token, scoped by its owner: `{user_id}.{token_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoginTokenKey {
    pub user_id: UserId,
    pub token_id: LoginTokenId,
}

impl LoginTokenKey {
    /// Creates a key for the given owner and token.
    pub fn new(user_id: UserId, token_id: LoginTokenId) -> Self {
        Self { user_id, token_id }
    }

    /// Key prefix shared by every token of a user.
    pub fn user_prefix(user_id: UserId) -> String {
        format!("{user_id}.")
    }
}

impl KvKey for LoginTokenKey {}

impl fmt::Display for LoginTokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.user_id, self.token_id)
    }
}

impl FromStr for LoginTokenKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |e: uuid::Error| Error::operation("parse_login_token_key", e.to_string());
        let (user_id, token_id) = s.split_once('.').ok_or_else(|| {
            Error::operation("parse_login_token_key", format!("missing separator: {s}"))
        })?;

        Ok(Self {
            user_id: user_id.parse().map_err(parse)?,
            token_id: token_id.parse().map_err(parse)?,
        })
    }
}

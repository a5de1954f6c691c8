//! Single-use login token record.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{LoginTokenId, UserId};

/// Server-side record of an issued magic link.
///
/// Only a one-way hash of the credential is stored. A record is redeemable
/// until it expires or is deleted by a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginToken {
    pub id: LoginTokenId,
    pub user_id: UserId,
    pub token_hash: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Data required to store a new login token.
///
/// The identifier is chosen by the caller so it can be embedded in the
/// credential the record protects.
#[derive(Debug, Clone)]
pub struct NewLoginToken {
    pub id: LoginTokenId,
    pub user_id: UserId,
    pub token_hash: String,
    pub ttl: Duration,
}

impl LoginToken {
    /// Builds a record that expires `ttl` after now.
    pub fn new(new_token: NewLoginToken) -> Self {
        let created_at = Timestamp::now();
        let expires_at = created_at
            .checked_add(new_token.ttl)
            .unwrap_or(Timestamp::MAX);

        Self {
            id: new_token.id,
            user_id: new_token.user_id,
            token_hash: new_token.token_hash,
            created_at,
            expires_at,
        }
    }

    /// Returns whether the token has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Timestamp::now())
    }

    /// Returns whether the token is expired at the given instant.
    #[inline]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Ordering key that sorts newer tokens first.
    pub(crate) fn newest_first(a: &LoginToken, b: &LoginToken) -> std::cmp::Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(ttl: Duration) -> LoginToken {
        LoginToken::new(NewLoginToken {
            id: LoginTokenId::new(),
            user_id: UserId::new(),
            token_hash: "$argon2id$stub".to_owned(),
            ttl,
        })
    }

    #[test]
    fn test_fresh_token_is_live() {
        let token = token(Duration::from_secs(3600));
        assert!(!token.is_expired());
        assert!(token.expires_at > token.created_at);
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let token = token(Duration::ZERO);
        assert!(token.is_expired());
    }

    #[test]
    fn test_expired_at_boundary() {
        let token = token(Duration::from_secs(60));
        assert!(token.is_expired_at(token.expires_at));
        assert!(!token.is_expired_at(token.created_at));
    }
}

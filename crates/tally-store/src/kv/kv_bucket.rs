//! Key-value bucket configuration traits.

use std::time::Duration;

/// Marker trait for KV bucket configuration.
pub trait KvBucket: Clone + Send + Sync + 'static {
    /// Bucket name used in NATS KV.
    const NAME: &'static str;

    /// Human-readable description for the bucket.
    const DESCRIPTION: &'static str;

    /// Default TTL for entries in this bucket.
    /// Returns `None` for buckets where entries should not expire.
    const TTL: Option<Duration>;
}

/// Bucket for user documents keyed by user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UsersBucket;

impl KvBucket for UsersBucket {
    const NAME: &'static str = "tally_users";
    const DESCRIPTION: &'static str = "Registered users";
    const TTL: Option<Duration> = None;
}

/// Unique index from email digest to user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UserEmailsBucket;

impl KvBucket for UserEmailsBucket {
    const NAME: &'static str = "tally_user_emails";
    const DESCRIPTION: &'static str = "Unique email index for users";
    const TTL: Option<Duration> = None;
}

/// Bucket for poll documents keyed by poll id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PollsBucket;

impl KvBucket for PollsBucket {
    const NAME: &'static str = "tally_polls";
    const DESCRIPTION: &'static str = "Polls and their vote counters";
    const TTL: Option<Duration> = None;
}

/// Bucket for single-use login tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoginTokensBucket;

impl KvBucket for LoginTokensBucket {
    const NAME: &'static str = "tally_login_tokens";
    const DESCRIPTION: &'static str = "Hashed magic-link login tokens";
    const TTL: Option<Duration> = Some(Duration::from_secs(60 * 60)); // 1 hour
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_tokens_bucket() {
        assert_eq!(LoginTokensBucket::NAME, "tally_login_tokens");
        assert_eq!(LoginTokensBucket::TTL, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_document_buckets_do_not_expire() {
        assert_eq!(UsersBucket::TTL, None);
        assert_eq!(UserEmailsBucket::TTL, None);
        assert_eq!(PollsBucket::TTL, None);
    }
}

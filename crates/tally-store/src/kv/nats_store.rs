//! [`DocumentStore`] backed by NATS JetStream key-value buckets.

use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;

use super::keyed_lock::KeyedLocks;
use super::{
    EmailKey, KvStore, LoginTokenKey, LoginTokensBucket, PollsBucket, UserEmailsBucket,
    UsersBucket,
};
use crate::model::{LoginToken, LoginTokenId, NewLoginToken, NewPoll, Poll, PollId, User, UserId};
use crate::store::{DocumentStore, LoginTokenRepository, PollRepository, UserRepository};
use crate::{Error, NatsClient, Result, TRACING_TARGET_KV};

/// Upper bound of compare-and-swap attempts for a single vote.
///
/// Writers in this process are serialized per poll, so conflicts only come
/// from other processes sharing the bucket.
const MAX_VOTE_ATTEMPTS: u32 = 32;

/// Delay added per failed attempt before retrying a conflicting vote.
const VOTE_RETRY_STEP: Duration = Duration::from_millis(5);

/// NATS JetStream implementation of every repository.
#[derive(Clone)]
pub struct NatsStore {
    client: NatsClient,
    users: KvStore<UserId, User, UsersBucket>,
    emails: KvStore<EmailKey, UserId, UserEmailsBucket>,
    polls: KvStore<PollId, Poll, PollsBucket>,
    tokens: KvStore<LoginTokenKey, LoginToken, LoginTokensBucket>,
    poll_locks: KeyedLocks<PollId>,
}

impl NatsStore {
    /// Opens (or creates) every bucket used by the store.
    #[tracing::instrument(skip(client), target = TRACING_TARGET_KV)]
    pub async fn new(client: NatsClient) -> Result<Self> {
        let store = Self {
            users: client.kv_store().await?,
            emails: client.kv_store().await?,
            polls: client.kv_store().await?,
            tokens: client.kv_store().await?,
            poll_locks: KeyedLocks::new(),
            client,
        };

        tracing::info!(
            target: TRACING_TARGET_KV,
            buckets = ?[
                store.users.bucket_name(),
                store.emails.bucket_name(),
                store.polls.bucket_name(),
                store.tokens.bucket_name(),
            ],
            "Document buckets ready"
        );
        Ok(store)
    }

    /// Returns the underlying NATS client.
    pub fn client(&self) -> &NatsClient {
        &self.client
    }

    async fn user_by_email_key(&self, key: &EmailKey) -> Result<Option<User>> {
        match self.emails.get_value(key).await? {
            Some(user_id) => self.users.get_value(&user_id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for NatsStore {
    #[tracing::instrument(skip(self, email), target = TRACING_TARGET_KV)]
    async fn find_or_create_user(&self, email: &str) -> Result<User> {
        let key = EmailKey::from_email(email);
        if let Some(user) = self.user_by_email_key(&key).await? {
            return Ok(user);
        }

        // The document is written before the index entry, so an index hit
        // always resolves to a stored user.
        let user = User::new(email);
        self.users.put(&user.id, &user).await?;

        if self.emails.create(&key, &user.id).await?.is_some() {
            tracing::debug!(
                target: TRACING_TARGET_KV,
                user_id = %user.id,
                "Created user"
            );
            return Ok(user);
        }

        self.users.delete(&user.id).await?;
        self.user_by_email_key(&key).await?.ok_or_else(|| {
            Error::operation("find_or_create_user", "email index points to a missing user")
        })
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        self.users.get_value(&user_id).await
    }

    #[tracing::instrument(skip(self, email), target = TRACING_TARGET_KV)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_by_email_key(&EmailKey::from_email(email)).await
    }
}

#[async_trait]
impl PollRepository for NatsStore {
    async fn create_poll(&self, new_poll: NewPoll) -> Result<Poll> {
        let poll = Poll::new(new_poll);
        self.polls.put(&poll.id, &poll).await?;
        Ok(poll)
    }

    async fn list_polls(&self) -> Result<Vec<Poll>> {
        let mut polls = self.polls.values().await?;
        polls.sort_by(Poll::newest_first);
        Ok(polls)
    }

    async fn find_poll_by_id(&self, poll_id: PollId) -> Result<Option<Poll>> {
        self.polls.get_value(&poll_id).await
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn increment_vote(&self, poll_id: PollId, option_index: usize) -> Result<Option<Poll>> {
        let _guard = self.poll_locks.lock(poll_id).await;

        for attempt in 1..=MAX_VOTE_ATTEMPTS {
            let Some(current) = self.polls.get(&poll_id).await? else {
                return Ok(None);
            };

            let mut poll = current.value;
            poll.record_vote(option_index)?;

            if self
                .polls
                .update(&poll_id, &poll, current.revision)
                .await?
                .is_some()
            {
                return Ok(Some(poll));
            }

            tracing::debug!(
                target: TRACING_TARGET_KV,
                poll_id = %poll_id,
                attempt,
                "Vote conflicted with a concurrent write, retrying"
            );
            tokio::time::sleep(VOTE_RETRY_STEP * attempt).await;
        }

        Err(Error::contention(poll_id.to_string(), MAX_VOTE_ATTEMPTS))
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn delete_poll(&self, poll_id: PollId) -> Result<bool> {
        let _guard = self.poll_locks.lock(poll_id).await;

        // A write from another process between the read and the purge bumps
        // the revision; the poll still exists then, so try again.
        loop {
            let Some(current) = self.polls.get(&poll_id).await? else {
                return Ok(false);
            };

            if self
                .polls
                .delete_at_revision(&poll_id, current.revision)
                .await?
            {
                return Ok(true);
            }
        }
    }
}

#[async_trait]
impl LoginTokenRepository for NatsStore {
    async fn create_login_token(&self, new_token: NewLoginToken) -> Result<LoginToken> {
        let token = LoginToken::new(new_token);
        let key = LoginTokenKey::new(token.user_id, token.id);
        self.tokens.put(&key, &token).await?;
        Ok(token)
    }

    async fn find_login_token(
        &self,
        user_id: UserId,
        token_id: LoginTokenId,
    ) -> Result<Option<LoginToken>> {
        let key = LoginTokenKey::new(user_id, token_id);
        let token = self.tokens.get_value(&key).await?;
        Ok(token.filter(|token| !token.is_expired()))
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn list_login_tokens(&self, user_id: UserId) -> Result<Vec<LoginToken>> {
        let now = Timestamp::now();
        let mut tokens = Vec::new();

        for key in self.tokens.keys().await? {
            if key.user_id != user_id {
                continue;
            }
            if let Some(token) = self.tokens.get_value(&key).await?
                && !token.is_expired_at(now)
            {
                tokens.push(token);
            }
        }

        tokens.sort_by(LoginToken::newest_first);
        Ok(tokens)
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    async fn delete_login_token(&self, user_id: UserId, token_id: LoginTokenId) -> Result<bool> {
        let key = LoginTokenKey::new(user_id, token_id);
        match self.tokens.get(&key).await? {
            Some(current) => self.tokens.delete_at_revision(&key, current.revision).await,
            None => Ok(false),
        }
    }

    async fn purge_expired_tokens(&self) -> Result<usize> {
        let now = Timestamp::now();
        let mut purged = 0;

        for key in self.tokens.keys().await? {
            if let Some(current) = self.tokens.get(&key).await?
                && current.value.is_expired_at(now)
                && self.tokens.delete_at_revision(&key, current.revision).await?
            {
                purged += 1;
            }
        }

        Ok(purged)
    }
}

impl DocumentStore for NatsStore {
    fn backend_name(&self) -> &'static str {
        "nats"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NatsConfig;

    async fn connect() -> anyhow::Result<NatsStore> {
        let url =
            std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_owned());
        let client = NatsClient::connect(NatsConfig::new(url)).await?;
        Ok(NatsStore::new(client).await?)
    }

    fn new_poll() -> NewPoll {
        NewPoll {
            question: "Tabs or spaces?".to_owned(),
            options: vec!["tabs".to_owned(), "spaces".to_owned()],
            created_by: UserId::new(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires a NATS server with JetStream (NATS_URL)"]
    async fn many_concurrent_votes_are_all_counted() -> anyhow::Result<()> {
        let store = connect().await?;
        let poll_id = store.create_poll(new_poll()).await?.id;

        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_vote(poll_id, i % 2).await })
            })
            .collect();

        for task in tasks {
            assert!(task.await??.is_some());
        }

        let poll = store
            .find_poll_by_id(poll_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("poll disappeared"))?;
        let total: u64 = poll.options.iter().map(|option| option.votes).sum();
        assert_eq!(total, 100);

        assert!(store.delete_poll(poll_id).await?);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires a NATS server with JetStream (NATS_URL)"]
    async fn delete_succeeds_while_votes_arrive() -> anyhow::Result<()> {
        let store = connect().await?;
        let poll_id = store.create_poll(new_poll()).await?.id;

        let votes: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_vote(poll_id, 0).await })
            })
            .collect();

        assert!(store.delete_poll(poll_id).await?);
        for vote in votes {
            vote.await??;
        }

        assert!(store.find_poll_by_id(poll_id).await?.is_none());
        assert!(!store.delete_poll(poll_id).await?);
        Ok(())
    }
}

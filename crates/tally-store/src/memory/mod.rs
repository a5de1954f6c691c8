//! Process-local document store.
//!
//! Each collection lives behind its own [`RwLock`]. Every read-modify-write
//! (find-or-create, vote increments, token deletion) runs under the write
//! lock of its collection, which makes those operations atomic within the
//! process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::model::{LoginToken, LoginTokenId, NewLoginToken, NewPoll, Poll, PollId, User, UserId};
use crate::store::{DocumentStore, LoginTokenRepository, PollRepository, UserRepository};
use crate::{Result, TRACING_TARGET_MEMORY};

/// In-memory [`DocumentStore`] backend.
///
/// Cheaply cloneable; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    users: RwLock<UserTable>,
    polls: RwLock<HashMap<PollId, Poll>>,
    tokens: RwLock<HashMap<LoginTokenId, LoginToken>>,
}

#[derive(Debug, Default)]
struct UserTable {
    by_id: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a task that purges expired login tokens every `interval`.
    ///
    /// The task stops when `shutdown` is cancelled.
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!(
                            target: TRACING_TARGET_MEMORY,
                            "Token sweeper stopped"
                        );
                        break;
                    }
                    _ = ticker.tick() => {
                        let purged = store.purge_expired().await;
                        if purged > 0 {
                            tracing::debug!(
                                target: TRACING_TARGET_MEMORY,
                                purged,
                                "Purged expired login tokens"
                            );
                        }
                    }
                }
            }
        })
    }

    async fn purge_expired(&self) -> usize {
        let now = Timestamp::now();
        let mut tokens = self.inner.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired_at(now));
        before - tokens.len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_or_create_user(&self, email: &str) -> Result<User> {
        let mut users = self.inner.users.write().await;

        if let Some(user) = users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
        {
            return Ok(user.clone());
        }

        let user = User::new(email);
        users.by_email.insert(user.email.clone(), user.id);
        users.by_id.insert(user.id, user.clone());

        tracing::debug!(
            target: TRACING_TARGET_MEMORY,
            user_id = %user.id,
            "Created user"
        );
        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let users = self.inner.users.read().await;
        Ok(users.by_id.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.inner.users.read().await;
        Ok(users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }
}

#[async_trait]
impl PollRepository for MemoryStore {
    async fn create_poll(&self, new_poll: NewPoll) -> Result<Poll> {
        let poll = Poll::new(new_poll);
        self.inner.polls.write().await.insert(poll.id, poll.clone());
        Ok(poll)
    }

    async fn list_polls(&self) -> Result<Vec<Poll>> {
        let mut polls: Vec<Poll> = self.inner.polls.read().await.values().cloned().collect();
        polls.sort_by(Poll::newest_first);
        Ok(polls)
    }

    async fn find_poll_by_id(&self, poll_id: PollId) -> Result<Option<Poll>> {
        Ok(self.inner.polls.read().await.get(&poll_id).cloned())
    }

    async fn increment_vote(&self, poll_id: PollId, option_index: usize) -> Result<Option<Poll>> {
        let mut polls = self.inner.polls.write().await;
        let Some(poll) = polls.get_mut(&poll_id) else {
            return Ok(None);
        };

        poll.record_vote(option_index)?;
        Ok(Some(poll.clone()))
    }

    async fn delete_poll(&self, poll_id: PollId) -> Result<bool> {
        Ok(self.inner.polls.write().await.remove(&poll_id).is_some())
    }
}

#[async_trait]
impl LoginTokenRepository for MemoryStore {
    async fn create_login_token(&self, new_token: NewLoginToken) -> Result<LoginToken> {
        let token = LoginToken::new(new_token);
        self.inner
            .tokens
            .write()
            .await
            .insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_login_token(
        &self,
        user_id: UserId,
        token_id: LoginTokenId,
    ) -> Result<Option<LoginToken>> {
        let tokens = self.inner.tokens.read().await;
        Ok(tokens
            .get(&token_id)
            .filter(|token| token.user_id == user_id && !token.is_expired())
            .cloned())
    }

    async fn list_login_tokens(&self, user_id: UserId) -> Result<Vec<LoginToken>> {
        let now = Timestamp::now();
        let mut tokens: Vec<LoginToken> = self
            .inner
            .tokens
            .read()
            .await
            .values()
            .filter(|token| token.user_id == user_id && !token.is_expired_at(now))
            .cloned()
            .collect();
        tokens.sort_by(LoginToken::newest_first);
        Ok(tokens)
    }

    async fn delete_login_token(&self, user_id: UserId, token_id: LoginTokenId) -> Result<bool> {
        let mut tokens = self.inner.tokens.write().await;
        let owned = tokens
            .get(&token_id)
            .is_some_and(|token| token.user_id == user_id);
        Ok(owned && tokens.remove(&token_id).is_some())
    }

    async fn purge_expired_tokens(&self) -> Result<usize> {
        Ok(self.purge_expired().await)
    }
}

impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

//! Repository traits implemented by every backend.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use derive_more::Deref;

use crate::Result;
use crate::model::{LoginToken, LoginTokenId, NewLoginToken, NewPoll, Poll, PollId, User, UserId};

/// Persistence of [`User`] documents.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns the user with the given email, creating it when absent.
    ///
    /// Concurrent calls with the same email resolve to exactly one user.
    async fn find_or_create_user(&self, email: &str) -> Result<User>;

    /// Finds a user by identifier.
    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>>;

    /// Finds a user by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Persistence of [`Poll`] documents.
#[async_trait]
pub trait PollRepository: Send + Sync {
    /// Stores a new poll with all counters at zero.
    async fn create_poll(&self, new_poll: NewPoll) -> Result<Poll>;

    /// Lists all polls, newest first.
    async fn list_polls(&self) -> Result<Vec<Poll>>;

    /// Finds a poll by identifier.
    async fn find_poll_by_id(&self, poll_id: PollId) -> Result<Option<Poll>>;

    /// Atomically increments one vote counter and returns the updated poll.
    ///
    /// Returns `Ok(None)` when the poll does not exist and
    /// [`Error::OptionOutOfRange`](crate::Error::OptionOutOfRange) when the
    /// index does not address an option. No increment is ever lost.
    async fn increment_vote(&self, poll_id: PollId, option_index: usize) -> Result<Option<Poll>>;

    /// Deletes a poll, returning whether it existed.
    async fn delete_poll(&self, poll_id: PollId) -> Result<bool>;
}

/// Persistence of single-use [`LoginToken`] records.
#[async_trait]
pub trait LoginTokenRepository: Send + Sync {
    /// Stores a new login token that expires after its TTL.
    async fn create_login_token(&self, new_token: NewLoginToken) -> Result<LoginToken>;

    /// Returns one unexpired token of a user.
    ///
    /// Expired records and records owned by another user are reported as
    /// absent.
    async fn find_login_token(
        &self,
        user_id: UserId,
        token_id: LoginTokenId,
    ) -> Result<Option<LoginToken>>;

    /// Lists the unexpired tokens of a user, newest first.
    async fn list_login_tokens(&self, user_id: UserId) -> Result<Vec<LoginToken>>;

    /// Deletes a login token.
    ///
    /// Returns `true` only for the single caller whose delete removed the
    /// record; every concurrent or later caller observes `false`.
    async fn delete_login_token(&self, user_id: UserId, token_id: LoginTokenId) -> Result<bool>;

    /// Removes expired tokens, returning how many were removed.
    async fn purge_expired_tokens(&self) -> Result<usize>;
}

/// A complete document store backend.
pub trait DocumentStore: UserRepository + PollRepository + LoginTokenRepository {
    /// Short backend name used in logs.
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to a [`DocumentStore`] backend.
///
/// Cloning is cheap; all clones refer to the same backend.
#[derive(Clone, Deref)]
pub struct StoreClient(Arc<dyn DocumentStore>);

impl StoreClient {
    /// Wraps a backend into a shared handle.
    pub fn new<S>(store: S) -> Self
    where
        S: DocumentStore + 'static,
    {
        Self(Arc::new(store))
    }

    /// Creates a handle backed by a fresh in-memory store.
    pub fn memory() -> Self {
        Self::new(crate::MemoryStore::new())
    }
}

impl fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreClient")
            .field("backend", &self.0.backend_name())
            .finish()
    }
}

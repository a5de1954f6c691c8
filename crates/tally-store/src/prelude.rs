//! Prelude module for tally-store.
//!
//! Re-exports the repository traits so their methods are callable on a
//! [`StoreClient`](crate::StoreClient) with a single `use` statement.

pub use crate::model::{
    LoginToken, LoginTokenId, NewLoginToken, NewPoll, Poll, PollId, PollOption, User, UserId,
};
pub use crate::{
    DocumentStore, Error, LoginTokenRepository, PollRepository, Result, StoreClient, StoreConfig,
    UserRepository,
};

//! Document types persisted by the store.
//!
//! Every document is serialized as camelCase JSON. Identifiers are UUIDv7,
//! so their natural order follows creation time.

mod ids;
mod login_token;
mod poll;
mod user;

pub use ids::{LoginTokenId, PollId, UserId};
pub use login_token::{LoginToken, NewLoginToken};
pub use poll::{NewPoll, Poll, PollOption};
pub use user::User;

//! Response types for HTTP handlers.

mod authentications;
mod errors;
mod monitors;
mod polls;
mod users;

pub use authentications::*;
pub use errors::*;
pub use monitors::*;
pub use polls::*;
pub use users::*;

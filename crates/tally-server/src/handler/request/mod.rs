//! Request types for HTTP handlers.

mod authentications;
mod paths;
mod polls;

pub use authentications::*;
pub use paths::*;
pub use polls::*;

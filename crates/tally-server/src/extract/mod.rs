//! Request extractors with uniform error responses.
//!
//! Every rejection is converted into the crate's HTTP [`Error`] so clients
//! always receive the same JSON error shape.
//!
//! - [`AuthHeader`] verifies the `Authorization: Bearer` session credential.
//! - [`AuthState`] additionally resolves the user it names.
//! - [`Json`], [`ValidateJson`] and [`Path`] wrap their axum counterparts.
//!
//! [`Error`]: crate::handler::Error

mod auth;
mod reject;

pub use crate::extract::auth::{AuthHeader, AuthState};
pub use crate::extract::reject::{Json, Path, ValidateJson};
